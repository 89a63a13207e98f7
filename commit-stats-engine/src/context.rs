//! Explicitly constructed engine context: HTTP client, fetch cache and
//! settings, shared by reference with caller-controlled lifetime. There is
//! no process-global client or memoization table.

use std::time::Duration;
use tracing::debug;

use crate::cache::FetchCache;
use crate::errors::StatsEngineResult;
use crate::github::{GitHubClient, GitHubConfig};

/// Values consumed by the engine; how they are loaded is the caller's
/// concern.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Branch names whose history is counted.
    pub branches: Vec<String>,
    /// Repositories per batched GraphQL request.
    pub batch_size: usize,
    /// Drop extension-less files at the ingestion boundary.
    pub ignore_no_extension: bool,
    /// Keep per-repository buckets in the report.
    pub per_repo_detail: bool,
    /// Upper bound on concurrent fetch workers.
    pub max_workers: usize,
    /// Per-request timeout; the only throttling applied.
    pub request_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            branches: vec!["main".to_string()],
            batch_size: 25,
            ignore_no_extension: false,
            per_repo_detail: true,
            max_workers: 4,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Shared context passed to every component.
#[derive(Debug)]
pub struct EngineContext {
    pub github: GitHubClient,
    pub cache: FetchCache,
    pub settings: EngineSettings,
}

impl EngineContext {
    /// Builds the shared HTTP client (stable user agent, configured
    /// timeout) and wraps it with a fresh cache.
    pub fn new(github: GitHubConfig, settings: EngineSettings) -> StatsEngineResult<Self> {
        debug!(
            branches = ?settings.branches,
            batch_size = settings.batch_size,
            max_workers = settings.max_workers,
            "constructing engine context"
        );

        let http = reqwest::Client::builder()
            .user_agent("commit-stats-engine/0.1")
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            github: GitHubClient::new(http, github)?,
            cache: FetchCache::new(),
            settings,
        })
    }
}
