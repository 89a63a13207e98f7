//! Commit history retrieval across repositories and branches.
//!
//! Repositories are processed in fixed-size batches; each batch is one
//! GraphQL request. Branch lists and per-branch histories are cursor-paged
//! until exhausted. Every round-trip (a batch, a refs page, a history page)
//! is an independent unit of fetch: on failure its partial contribution is
//! discarded, the reason is recorded, and the remaining units proceed.

use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::errors::{StatsEngineConfigError, StatsEngineResult};
use crate::github::batch::{
    self, BatchQuery, CommitNode, HistoryConnection, RefConnection, RepoNode,
};
use crate::github::GitHubClient;
use crate::identity;
use crate::model::{
    AuthorCandidates, CommitRef, FailedUnit, FileChange, FileStatus, RepoRef, TimeWindow,
};

/// Ordered commits per repository full name. Repositories with no
/// qualifying commits map to an empty sequence, not an error.
pub type CommitsByRepo = BTreeMap<String, Vec<CommitRef>>;

/// Fetch result: accumulated commits plus the units abandoned on the way.
#[derive(Debug, Default, Clone)]
pub struct HistoryFetchOutcome {
    pub commits_by_repo: CommitsByRepo,
    pub failed_units: Vec<FailedUnit>,
}

/// Commit history fetcher for one author over a repository set.
pub struct CommitHistoryFetcher<'a> {
    client: &'a GitHubClient,
    branches: &'a [String],
    batch_size: usize,
}

impl<'a> CommitHistoryFetcher<'a> {
    pub fn new(client: &'a GitHubClient, branches: &'a [String], batch_size: usize) -> Self {
        Self {
            client,
            branches,
            batch_size,
        }
    }

    /// Retrieves all commits by `author` across `repos` within `window`,
    /// deduplicated by sha within each repository across branches.
    pub async fn fetch(
        &self,
        repos: &[RepoRef],
        author: &str,
        window: &TimeWindow,
    ) -> StatsEngineResult<HistoryFetchOutcome> {
        if self.batch_size == 0 {
            return Err(StatsEngineConfigError::ZeroBatchSize.into());
        }

        let mut acc = Accumulator::new(repos);
        let mut failed = Vec::new();
        let mut pending_refs: Vec<PendingRefs> = Vec::new();
        let mut pending_history: Vec<PendingHistory> = Vec::new();

        // Phase 1: batched first pages.
        for (batch_idx, chunk) in repos.chunks(self.batch_size).enumerate() {
            let unit = format!("batch {batch_idx} ({} repos) for {author}", chunk.len());
            let query = BatchQuery::new(chunk);

            let body = match self
                .client
                .graphql(&query.document(), BatchQuery::variables(window))
                .await
            {
                Ok(body) => body,
                Err(e) => {
                    warn!(%unit, error = %e, "abandoning fetch unit");
                    failed.push(FailedUnit {
                        unit,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mut by_alias = match batch::split_envelope(body) {
                Ok(map) => map,
                Err(reason) => {
                    warn!(%unit, %reason, "abandoning fetch unit");
                    failed.push(FailedUnit { unit, reason });
                    continue;
                }
            };

            for (alias, repo) in query.entries() {
                let value = by_alias.remove(alias).unwrap_or(serde_json::Value::Null);
                match batch::decode_repo_node(value) {
                    Ok(node) => {
                        let (refs_next, histories) =
                            self.process_repo_node(&mut acc, repo, author, node, &mut failed);
                        if let Some(cursor) = refs_next {
                            pending_refs.push(PendingRefs {
                                repo: repo.clone(),
                                cursor,
                                page: 2,
                            });
                        }
                        pending_history.extend(histories);
                    }
                    Err(reason) => {
                        warn!(repo = %repo, %reason, "abandoning repository in batch");
                        failed.push(FailedUnit {
                            unit: format!("{repo} in batch {batch_idx}"),
                            reason,
                        });
                    }
                }
            }
        }

        // Phase 2: remaining branch-list pages, one repository at a time.
        while let Some(pending) = pending_refs.pop() {
            let unit = format!("{} refs page {}", pending.repo, pending.page);
            match self.fetch_refs_page(&pending, window).await {
                Ok(node) => {
                    let (refs_next, histories) =
                        self.process_repo_node(&mut acc, &pending.repo, author, node, &mut failed);
                    if let Some(cursor) = refs_next {
                        pending_refs.push(PendingRefs {
                            repo: pending.repo.clone(),
                            cursor,
                            page: pending.page + 1,
                        });
                    }
                    pending_history.extend(histories);
                }
                Err(reason) => {
                    warn!(%unit, %reason, "abandoning fetch unit");
                    failed.push(FailedUnit { unit, reason });
                }
            }
        }

        // Phase 3: remaining per-branch history pages, until exhausted.
        while let Some(pending) = pending_history.pop() {
            let unit = format!(
                "{}#{} history page {}",
                pending.repo, pending.branch, pending.page
            );
            match self.fetch_history_page(&pending, window).await {
                Ok(history) => {
                    let full_name = pending.repo.full_name();
                    let page_info = acc.absorb_history(&full_name, author, history);
                    if page_info.has_next_page {
                        if let Some(cursor) = page_info.end_cursor {
                            pending_history.push(PendingHistory {
                                repo: pending.repo.clone(),
                                branch: pending.branch.clone(),
                                cursor,
                                page: pending.page + 1,
                            });
                        }
                    }
                }
                Err(reason) => {
                    warn!(%unit, %reason, "abandoning fetch unit");
                    failed.push(FailedUnit { unit, reason });
                }
            }
        }

        let total: usize = acc.by_repo.values().map(Vec::len).sum();
        debug!(
            author,
            repos = repos.len(),
            commits = total,
            failed = failed.len(),
            "commit history fetch complete"
        );

        Ok(HistoryFetchOutcome {
            commits_by_repo: acc.by_repo,
            failed_units: failed,
        })
    }

    /// Absorbs one repository node (batch sub-query or refs page): filters
    /// the branch list, accumulates each branch's first history page and
    /// returns the refs continuation cursor plus history continuations.
    fn process_repo_node(
        &self,
        acc: &mut Accumulator,
        repo: &RepoRef,
        author: &str,
        node: RepoNode,
        failed: &mut Vec<FailedUnit>,
    ) -> (Option<String>, Vec<PendingHistory>) {
        let Some(refs) = node.refs else {
            failed.push(FailedUnit {
                unit: repo.full_name(),
                reason: "response carried no refs connection".to_string(),
            });
            return (None, Vec::new());
        };

        let (next_cursor, histories) = self.process_refs(acc, repo, author, refs);
        (next_cursor, histories)
    }

    fn process_refs(
        &self,
        acc: &mut Accumulator,
        repo: &RepoRef,
        author: &str,
        refs: RefConnection,
    ) -> (Option<String>, Vec<PendingHistory>) {
        let full_name = repo.full_name();
        let mut histories = Vec::new();

        for ref_node in refs.nodes.into_iter().flatten() {
            if !self.branches.iter().any(|b| b == &ref_node.name) {
                continue;
            }
            let Some(history) = ref_node.target.and_then(|t| t.history) else {
                // Non-commit target (e.g. a tag-ish ref); nothing to count.
                continue;
            };
            let page_info = acc.absorb_history(&full_name, author, history);
            if page_info.has_next_page {
                if let Some(cursor) = page_info.end_cursor {
                    histories.push(PendingHistory {
                        repo: repo.clone(),
                        branch: ref_node.name,
                        cursor,
                        page: 2,
                    });
                }
            }
        }

        let next_cursor = refs
            .page_info
            .has_next_page
            .then_some(refs.page_info.end_cursor)
            .flatten();
        (next_cursor, histories)
    }

    async fn fetch_refs_page(
        &self,
        pending: &PendingRefs,
        window: &TimeWindow,
    ) -> Result<RepoNode, String> {
        let vars = json!({
            "owner": pending.repo.owner,
            "name": pending.repo.name,
            "cursor": pending.cursor,
            "since": batch::git_timestamp(&window.since),
            "until": batch::git_timestamp(&window.until),
        });

        let body = self
            .client
            .graphql(&batch::refs_page_document(), vars)
            .await
            .map_err(|e| e.to_string())?;

        let mut by_alias = batch::split_envelope(body)?;
        let value = by_alias.remove("repo").unwrap_or(serde_json::Value::Null);
        batch::decode_repo_node(value)
    }

    async fn fetch_history_page(
        &self,
        pending: &PendingHistory,
        window: &TimeWindow,
    ) -> Result<HistoryConnection, String> {
        let vars = json!({
            "owner": pending.repo.owner,
            "name": pending.repo.name,
            "branch": format!("refs/heads/{}", pending.branch),
            "cursor": pending.cursor,
            "since": batch::git_timestamp(&window.since),
            "until": batch::git_timestamp(&window.until),
        });

        let body = self
            .client
            .graphql(&batch::history_page_document(), vars)
            .await
            .map_err(|e| e.to_string())?;

        let mut by_alias = batch::split_envelope(body)?;
        let value = by_alias.remove("repo").unwrap_or(serde_json::Value::Null);
        let node = batch::decode_repo_node(value)?;

        node.single_ref
            .and_then(|r| r.target)
            .and_then(|t| t.history)
            .ok_or_else(|| "response carried no history connection".to_string())
    }
}

/// A branch-list page still to fetch for a repository.
#[derive(Debug, Clone)]
struct PendingRefs {
    repo: RepoRef,
    cursor: String,
    page: u32,
}

/// A history page still to fetch for one branch.
#[derive(Debug, Clone)]
struct PendingHistory {
    repo: RepoRef,
    branch: String,
    cursor: String,
    page: u32,
}

/// Per-repository commit accumulator with sha deduplication.
struct Accumulator {
    by_repo: CommitsByRepo,
    seen: HashMap<String, HashSet<String>>,
}

impl Accumulator {
    fn new(repos: &[RepoRef]) -> Self {
        let by_repo = repos
            .iter()
            .map(|r| (r.full_name(), Vec::new()))
            .collect();
        Self {
            by_repo,
            seen: HashMap::new(),
        }
    }

    /// Folds one history page into the repository's commit list, applying
    /// the author filter and dropping shas already recorded for the repo
    /// (earlier branch or earlier page). Returns the page info so the
    /// caller can continue paging.
    fn absorb_history(
        &mut self,
        repo_full_name: &str,
        author: &str,
        history: HistoryConnection,
    ) -> batch::PageInfo {
        let seen = self.seen.entry(repo_full_name.to_string()).or_default();
        let commits = self.by_repo.entry(repo_full_name.to_string()).or_default();

        for node in history.nodes.into_iter().flatten() {
            if seen.contains(&node.oid) {
                continue;
            }
            let commit = commit_from_node(node);
            if !identity::matches(author, &commit.author) {
                continue;
            }
            seen.insert(commit.sha.clone());
            commits.push(commit);
        }

        history.page_info
    }
}

/// Converts a GraphQL commit node into the engine's commit record. File
/// changes come from the first associated pull request when present.
fn commit_from_node(node: CommitNode) -> CommitRef {
    let author = node
        .author
        .map(|a| AuthorCandidates {
            login: a.user.map(|u| u.login),
            email: a.email,
            name: a.name,
        })
        .unwrap_or_default();

    let files = node
        .associated_pull_requests
        .into_iter()
        .flat_map(|prs| prs.nodes)
        .flatten()
        .take(1)
        .filter_map(|pr| pr.files)
        .flat_map(|conn| conn.nodes)
        .flatten()
        .map(|f| FileChange {
            path: f.path,
            status: f
                .change_type
                .as_deref()
                .map(FileStatus::from_provider)
                .unwrap_or(FileStatus::Unknown),
            additions: f.additions,
            deletions: f.deletions,
            changes: f.additions + f.deletions,
        })
        .collect();

    CommitRef {
        sha: node.oid,
        author,
        authored_at: node.committed_date,
        additions: node.additions,
        deletions: node.deletions,
        files,
    }
}
