//! GitHub client (REST v3 + GraphQL v4) for repository listing, probing and
//! commit history retrieval.
//!
//! Endpoints used (as of 2025):
//!   * GET  /orgs/{org}/repos
//!   * HEAD /repos/{owner}/{repo}
//!   * POST {graphql_url} (batched commit history queries)

pub mod batch;
pub mod directory;
pub mod history;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::errors::{StatsEngineConfigError, StatsEngineError, StatsEngineResult};

/// Runtime configuration for the GitHub client.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST base, e.g. "https://api.github.com" or
    /// "https://github.example.com/api/v3" for Enterprise.
    pub rest_base: String,
    /// GraphQL endpoint; when `None` it is derived from `rest_base`.
    pub graphql_url: Option<String>,
    /// Bearer token (PAT). Required; rejected requests are fatal.
    pub token: String,
}

impl GitHubConfig {
    /// Derives the GraphQL endpoint from the REST base: the Enterprise
    /// `/api/v3` suffix maps to `/api/graphql`, github.com to its fixed
    /// GraphQL host, anything else to `<base>/graphql`.
    pub fn effective_graphql_url(&self) -> String {
        if let Some(url) = &self.graphql_url {
            return url.clone();
        }
        let base = self.rest_base.trim_end_matches('/');
        if let Some(prefix) = base.strip_suffix("/api/v3") {
            return format!("{prefix}/api/graphql");
        }
        if base == "https://api.github.com" {
            return "https://api.github.com/graphql".to_string();
        }
        format!("{base}/graphql")
    }
}

/// GitHub HTTP client wrapper shared by the directory and the fetcher.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    rest_base: String,
    graphql_url: String,
    token: String,
}

impl GitHubClient {
    /// Wraps a shared HTTP instance with base URLs and the auth token.
    pub fn new(http: Client, cfg: GitHubConfig) -> StatsEngineResult<Self> {
        if cfg.token.trim().is_empty() {
            return Err(StatsEngineError::Auth(
                "missing GitHub token; set GITHUB_TOKEN".into(),
            ));
        }
        if cfg.rest_base.trim().is_empty() {
            return Err(StatsEngineConfigError::InvalidBaseUrl("empty base url".into()).into());
        }

        let graphql_url = cfg.effective_graphql_url();
        debug!(rest_base = %cfg.rest_base, %graphql_url, "creating GitHubClient");

        Ok(Self {
            http,
            rest_base: cfg.rest_base.trim_end_matches('/').to_string(),
            graphql_url,
            token: cfg.token,
        })
    }

    pub fn rest_base(&self) -> &str {
        &self.rest_base
    }

    /// GET with auth headers against an absolute REST URL.
    pub(crate) async fn rest_get(&self, url: &str) -> StatsEngineResult<reqwest::Response> {
        let resp = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        Ok(resp)
    }

    /// HEAD with auth headers against an absolute REST URL.
    pub(crate) async fn rest_head(&self, url: &str) -> StatsEngineResult<reqwest::Response> {
        let resp = self
            .http
            .head(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        Ok(resp)
    }

    /// Posts one GraphQL document and returns the raw JSON envelope.
    ///
    /// Transport errors and non-2xx statuses surface as provider errors;
    /// shape validation happens in the caller so that a malformed alias can
    /// fail as a single unit instead of the whole request.
    pub(crate) async fn graphql(&self, query: &str, variables: Value) -> StatsEngineResult<Value> {
        debug!(url = %self.graphql_url, "posting GraphQL query");

        let body: Value = self
            .http
            .post(&self.graphql_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body)
    }
}
