//! Extension → display-name lookup for the rendered report.

use commit_stats_engine::model::NO_EXTENSION;

/// Maps a file extension to a human-readable language name. Unmapped
/// extensions render as themselves.
pub fn display_name(ext: &str) -> &str {
    match ext {
        "py" => "Python",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "java" => "Java",
        "cpp" => "C++",
        "c" => "C",
        "h" => "C Header",
        "cs" => "C#",
        "rb" => "Ruby",
        "go" => "Go",
        "rs" => "Rust",
        "php" => "PHP",
        "html" => "HTML",
        "css" => "CSS",
        "md" => "Markdown",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "sh" => "Shell",
        NO_EXTENSION => "Unknown",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_extensions() {
        assert_eq!(display_name("py"), "Python");
        assert_eq!(display_name("yml"), "YAML");
        assert_eq!(display_name(NO_EXTENSION), "Unknown");
        assert_eq!(display_name("zig"), "zig");
    }
}
