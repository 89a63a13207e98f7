//! Commit retrieval and aggregation engine.
//!
//! Turns (developer, repository, time-window) triples into deduplicated
//! commit and file-change statistics sourced from the GitHub API, tolerant
//! of per-repository and per-request failures.

pub mod aggregate;
pub mod cache;
pub mod context;
pub mod dispatch;
mod errors;
pub mod github;
pub mod identity;
pub mod model;
pub mod window;

pub use context::{EngineContext, EngineSettings};
pub use dispatch::ReportRun;
pub use errors::{StatsEngineConfigError, StatsEngineError, StatsEngineProviderError, StatsEngineResult};
pub use window::WindowSpec;

use std::sync::Arc;
use tracing::{info, warn};

use crate::github::directory;
use crate::model::{RepoRef, TimeWindow};

/// Where the candidate repository set comes from.
#[derive(Debug, Clone)]
pub enum RepoSource {
    /// Enumerate every repository under the organization.
    Organization(String),
    /// Use an explicit, already-parsed list.
    Explicit(Vec<RepoRef>),
}

/// Runs the full pipeline: resolve the window, collect and probe
/// repositories, fetch and aggregate per developer under the worker cap.
///
/// Per-repository probe failures and per-unit fetch failures are soft and
/// land in the returned summary; an empty valid repository set after
/// probing aborts the run before any history fetch.
pub async fn run_report(
    ctx: Arc<EngineContext>,
    developers: Vec<String>,
    source: RepoSource,
    window_spec: &WindowSpec,
) -> StatsEngineResult<ReportRun> {
    let window: TimeWindow = window::resolve(window_spec)?;

    let candidates = match source {
        RepoSource::Organization(org) => {
            info!(org, "listing organization repositories");
            directory::list_org_repos(&ctx.github, &org)
                .await
                .map_err(|e| {
                    StatsEngineError::Directory(format!(
                        "failed to list repositories of '{org}': {e}; \
check the organization name and token scopes"
                    ))
                })?
        }
        RepoSource::Explicit(repos) => repos,
    };

    info!(candidates = candidates.len(), "probing repositories");
    let (valid, dropped) = directory::probe_repositories(&ctx.github, candidates).await;

    if valid.is_empty() {
        return Err(StatsEngineError::Directory(
            "no valid repositories remain after probing; \
check repository names, network access and token scopes"
                .to_string(),
        ));
    }
    if !dropped.is_empty() {
        warn!(dropped = dropped.len(), "some repositories were skipped");
    }

    info!(
        since = %window.since,
        until = %window.until,
        repos = valid.len(),
        branches = ?ctx.settings.branches,
        "generating report"
    );

    let mut run = dispatch::generate_report(ctx, developers, valid, window).await;
    run.summary.dropped_repositories.extend(dropped);
    Ok(run)
}
