//! Aggregation of file-level change records into nested stat buckets.
//!
//! Folding is pure field-wise addition, so any folding order — sequential,
//! or partial reports produced by parallel workers and merged afterwards —
//! yields the same final report. The dispatcher relies on this.

use crate::model::{CommitRef, DeveloperStats, FileChange, Report, StatBucket, NO_EXTENSION};

/// Ingestion-boundary filtering applied before a file change reaches the
/// accumulators. Hidden files (leading-dot paths) are always excluded;
/// extension-less files only when configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestPolicy {
    pub ignore_no_extension: bool,
}

impl IngestPolicy {
    pub fn accepts(&self, fc: &FileChange) -> bool {
        if fc.is_hidden() {
            return false;
        }
        if self.ignore_no_extension && fc.extension() == NO_EXTENSION {
            return false;
        }
        true
    }
}

/// Folds one file change into a developer's stats: the total bucket, the
/// per-extension bucket and, when enabled, the per-repository bucket.
pub fn fold_file_change(
    stats: &mut DeveloperStats,
    repo_full_name: &str,
    fc: &FileChange,
    per_repo: bool,
) {
    let contribution = StatBucket::from_file_change(fc);
    let ext = fc.extension().to_string();

    stats.total.merge(&contribution);
    stats
        .by_file_type
        .entry(ext.clone())
        .or_default()
        .merge(&contribution);

    if per_repo {
        stats
            .by_repository
            .get_or_insert_with(Default::default)
            .entry(repo_full_name.to_string())
            .or_default()
            .entry(ext)
            .or_default()
            .merge(&contribution);
    }
}

/// Folds every accepted file change of every commit in a repository slice.
pub fn fold_commits(
    stats: &mut DeveloperStats,
    repo_full_name: &str,
    commits: &[CommitRef],
    policy: IngestPolicy,
    per_repo: bool,
) {
    for commit in commits {
        for fc in commit.files.iter().filter(|fc| policy.accepts(fc)) {
            fold_file_change(stats, repo_full_name, fc, per_repo);
        }
    }
}

/// Merges a partial developer slice into an accumulated one by field-wise
/// bucket addition.
pub fn merge_developer_stats(into: &mut DeveloperStats, partial: &DeveloperStats) {
    into.total.merge(&partial.total);
    for (ext, bucket) in &partial.by_file_type {
        into.by_file_type.entry(ext.clone()).or_default().merge(bucket);
    }
    if let Some(by_repo) = &partial.by_repository {
        let target = into.by_repository.get_or_insert_with(Default::default);
        for (repo, exts) in by_repo {
            let repo_entry = target.entry(repo.clone()).or_default();
            for (ext, bucket) in exts {
                repo_entry.entry(ext.clone()).or_default().merge(bucket);
            }
        }
    }
}

/// Merges a task-local partial report into the shared report.
pub fn merge_report(into: &mut Report, partial: &Report) {
    for (dev, stats) in &partial.developers {
        merge_developer_stats(into.developers.entry(dev.clone()).or_default(), stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileStatus;

    fn fc(path: &str, status: FileStatus, add: u64, del: u64) -> FileChange {
        FileChange {
            path: path.to_string(),
            status,
            additions: add,
            deletions: del,
            changes: add + del,
        }
    }

    fn sum_buckets<'a>(buckets: impl Iterator<Item = &'a StatBucket>) -> StatBucket {
        let mut total = StatBucket::default();
        for b in buckets {
            total.merge(b);
        }
        total
    }

    #[test]
    fn total_equals_sum_of_extension_buckets() {
        let changes = vec![
            fc("src/a.py", FileStatus::Modified, 10, 2),
            fc("docs/b.md", FileStatus::Added, 1, 0),
            fc("src/c.py", FileStatus::Removed, 0, 5),
        ];

        let mut stats = DeveloperStats::default();
        for c in &changes {
            fold_file_change(&mut stats, "acme/widgets", c, true);
        }

        assert_eq!(stats.total, sum_buckets(stats.by_file_type.values()));

        // Per-repository detail sums back to the per-extension buckets.
        let by_repo = stats.by_repository.as_ref().unwrap();
        for (ext, bucket) in &stats.by_file_type {
            let repo_sum = sum_buckets(
                by_repo
                    .values()
                    .filter_map(|exts| exts.get(ext.as_str())),
            );
            assert_eq!(&repo_sum, bucket, "extension {ext}");
        }
    }

    #[test]
    fn fold_order_does_not_matter() {
        let changes = vec![
            fc("a.rs", FileStatus::Added, 3, 0),
            fc("b.rs", FileStatus::Modified, 1, 1),
            fc("c.md", FileStatus::Renamed, 0, 0),
            fc("d.py", FileStatus::Removed, 0, 9),
        ];

        let mut forward = DeveloperStats::default();
        for c in &changes {
            fold_file_change(&mut forward, "o/r", c, true);
        }

        let mut backward = DeveloperStats::default();
        for c in changes.iter().rev() {
            fold_file_change(&mut backward, "o/r", c, true);
        }

        assert_eq!(forward.total, backward.total);
        assert_eq!(forward.by_file_type, backward.by_file_type);
        assert_eq!(forward.by_repository, backward.by_repository);
    }

    #[test]
    fn parallel_partition_merge_matches_sequential() {
        let changes: Vec<FileChange> = (0..20)
            .map(|i| {
                let status = match i % 4 {
                    0 => FileStatus::Added,
                    1 => FileStatus::Modified,
                    2 => FileStatus::Removed,
                    _ => FileStatus::Renamed,
                };
                fc(&format!("f{}.rs", i % 3), status, i, 20 - i)
            })
            .collect();

        let mut sequential = Report::default();
        for c in &changes {
            fold_file_change(
                sequential.developers.entry("dev".into()).or_default(),
                "o/r",
                c,
                true,
            );
        }

        // Fold two halves independently, then merge into a shared report.
        let mut merged = Report::default();
        for half in changes.chunks(10) {
            let mut partial = Report::default();
            for c in half {
                fold_file_change(
                    partial.developers.entry("dev".into()).or_default(),
                    "o/r",
                    c,
                    true,
                );
            }
            merge_report(&mut merged, &partial);
        }

        let s = &sequential.developers["dev"];
        let m = &merged.developers["dev"];
        assert_eq!(s.total, m.total);
        assert_eq!(s.by_file_type, m.by_file_type);
        assert_eq!(s.by_repository, m.by_repository);
    }

    #[test]
    fn ingest_policy_filters_hidden_and_extensionless() {
        let policy = IngestPolicy {
            ignore_no_extension: true,
        };
        assert!(policy.accepts(&fc("src/a.rs", FileStatus::Modified, 1, 0)));
        assert!(!policy.accepts(&fc(".github/workflows/ci.yml", FileStatus::Modified, 1, 0)));
        assert!(!policy.accepts(&fc("Makefile", FileStatus::Modified, 1, 0)));

        let lax = IngestPolicy {
            ignore_no_extension: false,
        };
        assert!(lax.accepts(&fc("Makefile", FileStatus::Modified, 1, 0)));
        assert!(!lax.accepts(&fc(".env", FileStatus::Added, 1, 0)));
        // A dot-directory below the top level does not hide the file.
        assert!(lax.accepts(&fc("ci/.gitlint", FileStatus::Added, 1, 0)));
    }

    #[test]
    fn unknown_status_counts_lines_but_no_status_counter() {
        let mut stats = DeveloperStats::default();
        fold_file_change(
            &mut stats,
            "o/r",
            &fc("x.py", FileStatus::Unknown, 4, 4),
            false,
        );
        assert_eq!(stats.total.changes, 8);
        assert_eq!(
            stats.total.added
                + stats.total.removed
                + stats.total.modifications
                + stats.total.renamed,
            0
        );
        assert!(stats.by_repository.is_none());
    }
}
