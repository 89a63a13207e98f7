//! Data model for repositories, commits, file changes and the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel extension used for paths without a `.` component.
pub const NO_EXTENSION: &str = "no_extension";

/// A repository addressed as `owner/name`.
///
/// Immutable once probed valid; the `owner/name` form is what the REST
/// routes and GraphQL `repository(owner:, name:)` fields expect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parses `owner/name` or returns `None` for anything else.
    pub fn parse(full_name: &str) -> Option<Self> {
        let mut parts = full_name.split('/');
        let owner = parts.next().unwrap_or("").trim();
        let name = parts.next().unwrap_or("").trim();

        if owner.is_empty() || name.is_empty() || parts.next().is_some() {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Inclusive time range over which commits are counted.
///
/// Invariant: `since <= until`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Possible author representations attached to a commit.
///
/// GitHub commits carry a git-level name/email pair and, when the email is
/// linked to an account, a platform login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorCandidates {
    pub login: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Status of a single file inside a commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
    Unknown,
}

impl FileStatus {
    /// Maps a provider status string (REST `status` or GraphQL `changeType`)
    /// onto the recognized set; anything else is `Unknown`.
    pub fn from_provider(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "added" => FileStatus::Added,
            "removed" | "deleted" => FileStatus::Removed,
            "modified" | "changed" => FileStatus::Modified,
            "renamed" => FileStatus::Renamed,
            _ => FileStatus::Unknown,
        }
    }
}

/// One file touched by a commit, with its line deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
}

impl FileChange {
    /// Extension bucket for this path: substring after the last `.`, or the
    /// `no_extension` sentinel. The leading-dot (hidden file) policy is
    /// applied by the ingestion filter, not here.
    pub fn extension(&self) -> &str {
        let file_name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match file_name.rfind('.') {
            Some(idx) if idx > 0 => &file_name[idx + 1..],
            _ => NO_EXTENSION,
        }
    }

    /// True for paths starting with a dot (e.g. `.gitignore`,
    /// `.github/workflows/ci.yml`). A dot-directory below the top level
    /// does not hide the file.
    pub fn is_hidden(&self) -> bool {
        self.path.starts_with('.')
    }
}

/// A commit as returned by the history fetcher.
///
/// `files` may be empty when the provider exposed no per-file breakdown for
/// the commit; line totals are still present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
    pub author: AuthorCandidates,
    pub authored_at: Option<DateTime<Utc>>,
    pub additions: u64,
    pub deletions: u64,
    pub files: Vec<FileChange>,
}

/// The atomic accumulator of line and file-status counts.
///
/// Combines via field-wise addition: commutative, associative, with the
/// all-zero bucket as identity. This is what makes parallel folding safe.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatBucket {
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    pub added: u64,
    pub removed: u64,
    pub modifications: u64,
    pub renamed: u64,
}

impl StatBucket {
    /// Field-wise addition of `other` into `self`.
    pub fn merge(&mut self, other: &StatBucket) {
        self.additions += other.additions;
        self.deletions += other.deletions;
        self.changes += other.changes;
        self.added += other.added;
        self.removed += other.removed;
        self.modifications += other.modifications;
        self.renamed += other.renamed;
    }

    /// Contribution of a single file change: its line deltas plus exactly
    /// one status counter. An unrecognized status increments none of the
    /// per-status counters but still contributes its line totals.
    pub fn from_file_change(fc: &FileChange) -> Self {
        let mut b = StatBucket {
            additions: fc.additions,
            deletions: fc.deletions,
            changes: fc.changes,
            ..StatBucket::default()
        };
        match fc.status {
            FileStatus::Added => b.added = 1,
            FileStatus::Removed => b.removed = 1,
            FileStatus::Modified => b.modifications = 1,
            FileStatus::Renamed => b.renamed = 1,
            FileStatus::Unknown => {}
        }
        b
    }
}

/// Per-developer slice of the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeveloperStats {
    pub total: StatBucket,
    pub by_file_type: BTreeMap<String, StatBucket>,
    /// Present only when per-repository detail was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_repository: Option<BTreeMap<String, BTreeMap<String, StatBucket>>>,
}

/// Root output structure: developer handle → nested stats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub developers: BTreeMap<String, DeveloperStats>,
}

/// A repository dropped during probing, with the recorded reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedRepository {
    pub repo: String,
    pub reason: String,
}

/// A fetch unit (batch request or branch page) abandoned during retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedUnit {
    /// Human-readable identifier of the unit, e.g. `batch[0..25] for jdoe`
    /// or `acme/widgets refs page 3`.
    pub unit: String,
    pub reason: String,
}

/// Soft-failure summary produced alongside the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub dropped_repositories: Vec<DroppedRepository>,
    pub failed_units: Vec<FailedUnit>,
}

/// Flat per-file row used by the CSV exporter.
#[derive(Debug, Clone, Serialize)]
pub struct FileRow {
    pub repo: String,
    pub commit_sha: String,
    pub filename: String,
    pub changes: u64,
    pub file_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_ref_parse() {
        let r = RepoRef::parse("acme/widgets").unwrap();
        assert_eq!(r.owner, "acme");
        assert_eq!(r.name, "widgets");
        assert_eq!(r.full_name(), "acme/widgets");

        assert!(RepoRef::parse("acme").is_none());
        assert!(RepoRef::parse("acme/widgets/extra").is_none());
        assert!(RepoRef::parse("/widgets").is_none());
    }

    #[test]
    fn extension_derivation() {
        let fc = |path: &str| FileChange {
            path: path.to_string(),
            status: FileStatus::Modified,
            additions: 0,
            deletions: 0,
            changes: 0,
        };

        assert_eq!(fc("src/main.rs").extension(), "rs");
        assert_eq!(fc("Makefile").extension(), NO_EXTENSION);
        assert_eq!(fc("a/b/archive.tar.gz").extension(), "gz");
        // A leading dot is not an extension separator.
        assert_eq!(fc(".gitignore").extension(), NO_EXTENSION);
        assert!(fc(".gitignore").is_hidden());
        assert!(fc(".github/workflows/ci.yml").is_hidden());
        assert!(!fc("ci/.gitlint").is_hidden());
        assert!(!fc("src/lib.rs").is_hidden());
    }

    #[test]
    fn bucket_contribution_by_status() {
        let fc = FileChange {
            path: "src/lib.rs".into(),
            status: FileStatus::Removed,
            additions: 0,
            deletions: 5,
            changes: 5,
        };
        let b = StatBucket::from_file_change(&fc);
        assert_eq!(b.removed, 1);
        assert_eq!(b.added + b.modifications + b.renamed, 0);
        assert_eq!(b.deletions, 5);

        // Unknown status keeps line totals but no status counter.
        let fc = FileChange {
            status: FileStatus::Unknown,
            ..fc
        };
        let b = StatBucket::from_file_change(&fc);
        assert_eq!(b.added + b.removed + b.modifications + b.renamed, 0);
        assert_eq!(b.changes, 5);
    }

    #[test]
    fn provider_status_mapping() {
        assert_eq!(FileStatus::from_provider("ADDED"), FileStatus::Added);
        assert_eq!(FileStatus::from_provider("deleted"), FileStatus::Removed);
        assert_eq!(FileStatus::from_provider("CHANGED"), FileStatus::Modified);
        assert_eq!(FileStatus::from_provider("copied"), FileStatus::Unknown);
    }
}
