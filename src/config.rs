//! Environment-based application configuration and list-file loading.

use commit_stats_engine::github::GitHubConfig;
use commit_stats_engine::{EngineSettings, WindowSpec};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the binary needs, loaded from environment variables (with a
/// `.env` file honored when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub use_org_repos: bool,
    pub organization: Option<String>,
    pub devs_file: PathBuf,
    pub repos_file: PathBuf,
    pub window: WindowSpec,
    pub settings: EngineSettings,
    pub debug_mode: bool,
    pub debug_dev: Option<String>,
    pub debug_repo: Option<String>,
    /// When set, the flat per-file rows are also written here as CSV.
    pub csv_out: Option<PathBuf>,
}

impl AppConfig {
    /// Loads shared configuration from environment variables.
    ///
    /// The token is read here but validated by the engine, which turns an
    /// absent value into a fatal auth error before any network activity.
    pub fn from_env() -> Self {
        let rest_base = std::env::var("GITHUB_API_BASE")
            .unwrap_or_else(|_| "https://api.github.com".into());

        Self {
            github: GitHubConfig {
                rest_base,
                graphql_url: std::env::var("GITHUB_GRAPHQL_URL").ok(),
                token: std::env::var("GITHUB_TOKEN").unwrap_or_default(),
            },
            use_org_repos: env_bool("USE_ORG_REPOS", false),
            organization: std::env::var("GITHUB_ORG").ok().filter(|s| !s.is_empty()),
            devs_file: std::env::var("DEVS_FILE")
                .unwrap_or_else(|_| "devs.txt".into())
                .into(),
            repos_file: std::env::var("REPOS_FILE")
                .unwrap_or_else(|_| "repos.txt".into())
                .into(),
            window: WindowSpec {
                range: std::env::var("TIME_RANGE").ok().filter(|s| !s.is_empty()),
                last_months: env_parse("LAST_MONTHS", 3),
            },
            settings: EngineSettings {
                branches: std::env::var("BRANCHES")
                    .unwrap_or_else(|_| "main".into())
                    .split(',')
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect(),
                batch_size: env_parse("BATCH_SIZE", 25),
                ignore_no_extension: env_bool("IGNORE_NO_EXTENSION", false),
                per_repo_detail: env_bool("SHOW_REPO_STATS", true),
                max_workers: env_parse("MAX_WORKERS", 4),
                request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECS", 10)),
            },
            debug_mode: env_bool("DEBUG_MODE", false),
            debug_dev: std::env::var("DEBUG_DEV").ok().filter(|s| !s.is_empty()),
            debug_repo: std::env::var("DEBUG_REPO").ok().filter(|s| !s.is_empty()),
            csv_out: std::env::var("CSV_OUT")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Reads a newline list (developer handles), stripping blank lines and
/// `#`/`;` comment lines.
pub fn load_list_file(path: &std::path::Path) -> std::io::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_list(&text))
}

pub fn parse_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';'))
        .map(str::to_string)
        .collect()
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_parsing_strips_comments() {
        let text = "# team\njdoe\n\n; on leave\nasmith\n  mrichter  \n";
        assert_eq!(parse_list(text), vec!["jdoe", "asmith", "mrichter"]);
    }

    #[test]
    fn list_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devs.txt");
        std::fs::write(&path, "jdoe\n# comment\nasmith\n").unwrap();
        assert_eq!(load_list_file(&path).unwrap(), vec!["jdoe", "asmith"]);
    }
}
