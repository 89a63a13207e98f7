//! Bounded worker pool for per-developer fetch+aggregate tasks.
//!
//! Each task fetches one developer's commits across all repositories
//! (batched internally by the fetcher, served through the shared cache) and
//! folds them into an isolated partial report. A single coordinator merges
//! completed partials into the shared report, so concurrent workers never
//! touch the same bucket. Completion order does not affect the result; the
//! merge law in `aggregate` guarantees that.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::aggregate::{self, IngestPolicy};
use crate::context::EngineContext;
use crate::github::history::CommitHistoryFetcher;
use crate::model::{
    DeveloperStats, FailedUnit, FileRow, RepoRef, Report, RunSummary, TimeWindow,
};

/// Everything a finished run produces: the report, the soft-failure
/// summary, and flat per-file rows for the CSV exporter.
#[derive(Debug, Default)]
pub struct ReportRun {
    pub report: Report,
    pub summary: RunSummary,
    pub file_rows: Vec<FileRow>,
}

struct TaskOutput {
    developer: String,
    partial: DeveloperStats,
    failed_units: Vec<FailedUnit>,
    file_rows: Vec<FileRow>,
}

/// Runs one fetch+aggregate task per developer under the worker cap and
/// merges the partial results.
pub async fn generate_report(
    ctx: Arc<EngineContext>,
    developers: Vec<String>,
    repos: Vec<RepoRef>,
    window: TimeWindow,
) -> ReportRun {
    let pool_size = ctx.settings.max_workers.min(developers.len()).max(1);
    let semaphore = Arc::new(Semaphore::new(pool_size));
    let repos = Arc::new(repos);

    info!(
        developers = developers.len(),
        repos = repos.len(),
        workers = pool_size,
        "dispatching fetch tasks"
    );

    let mut run = ReportRun::default();
    // Every requested developer appears in the report, commits or not.
    for dev in &developers {
        run.report.developers.entry(dev.clone()).or_default();
    }

    let mut tasks = JoinSet::new();
    for developer in developers {
        let ctx = ctx.clone();
        let repos = repos.clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            run_developer_task(ctx.as_ref(), repos.as_slice(), developer, &window).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(out) => {
                aggregate::merge_developer_stats(
                    run.report.developers.entry(out.developer).or_default(),
                    &out.partial,
                );
                run.summary.failed_units.extend(out.failed_units);
                run.file_rows.extend(out.file_rows);
            }
            Err(e) => {
                // A panicked task loses only its own contribution.
                error!(error = %e, "fetch task failed; continuing with siblings");
            }
        }
    }

    run
}

async fn run_developer_task(
    ctx: &EngineContext,
    repos: &[RepoRef],
    developer: String,
    window: &TimeWindow,
) -> TaskOutput {
    let dev = developer.as_str();
    let lookup = ctx
        .cache
        .get_or_fetch(repos, dev, window, || async move {
            let fetcher = CommitHistoryFetcher::new(
                &ctx.github,
                &ctx.settings.branches,
                ctx.settings.batch_size,
            );
            fetcher.fetch(repos, dev, window).await
        })
        .await;

    let (commits_by_repo, failed_units) = match lookup {
        Ok(lookup) => (lookup.commits_by_repo, lookup.failed_units),
        Err(e) => {
            error!(developer, error = %e, "commit fetch failed for developer");
            return TaskOutput {
                partial: DeveloperStats::default(),
                failed_units: vec![FailedUnit {
                    unit: format!("fetch for {developer}"),
                    reason: e.to_string(),
                }],
                file_rows: Vec::new(),
                developer,
            };
        }
    };

    let policy = IngestPolicy {
        ignore_no_extension: ctx.settings.ignore_no_extension,
    };

    let mut partial = DeveloperStats::default();
    let mut file_rows = Vec::new();

    for (repo_name, commits) in commits_by_repo.iter() {
        aggregate::fold_commits(
            &mut partial,
            repo_name,
            commits,
            policy,
            ctx.settings.per_repo_detail,
        );
        for commit in commits {
            for fc in &commit.files {
                file_rows.push(FileRow {
                    repo: repo_name.clone(),
                    commit_sha: commit.sha.clone(),
                    filename: fc.path.clone(),
                    changes: fc.changes,
                    file_type: fc.extension().to_string(),
                });
            }
        }
    }

    debug!(
        developer,
        commits = commits_by_repo.values().map(Vec::len).sum::<usize>(),
        "developer task complete"
    );

    TaskOutput {
        developer,
        partial,
        failed_units,
        file_rows,
    }
}
