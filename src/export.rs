//! One-off CSV export of flat per-file change rows.

use commit_stats_engine::model::FileRow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `repo,commit_sha,filename,changes,file_type` rows.
pub fn write_csv(path: &Path, rows: &[FileRow]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "repo,commit_sha,filename,changes,file_type")?;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{},{}",
            field(&row.repo),
            field(&row.commit_sha),
            field(&row.filename),
            row.changes,
            field(&row.file_type),
        )?;
    }
    out.flush()
}

/// Quotes a field when it contains a separator, quote or newline.
fn field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(field("plain"), "plain");
        assert_eq!(field("a,b"), "\"a,b\"");
        assert_eq!(field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let rows = vec![FileRow {
            repo: "acme/widgets".into(),
            commit_sha: "abc123".into(),
            filename: "src/a,b.py".into(),
            changes: 12,
            file_type: "py".into(),
        }];
        write_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "repo,commit_sha,filename,changes,file_type"
        );
        assert_eq!(
            lines.next().unwrap(),
            "acme/widgets,abc123,\"src/a,b.py\",12,py"
        );
    }
}
