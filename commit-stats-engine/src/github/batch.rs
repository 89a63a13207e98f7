//! Typed GraphQL batch-request builder.
//!
//! One batched document carries an aliased sub-query per repository. The
//! alias → repository mapping is deterministic (`r0`, `r1`, … in batch
//! order) and is used again to address the response, so there is no
//! positional string interpolation between request and reply.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::model::{RepoRef, TimeWindow};

/// Branch-list page size per request.
pub const REFS_PAGE_SIZE: u32 = 50;
/// Commit-history page size per request.
pub const HISTORY_PAGE_SIZE: u32 = 100;
/// Per-commit file-list page size.
pub const FILES_PAGE_SIZE: u32 = 100;

/// Shared selection for one commit node.
fn commit_fields() -> String {
    format!(
        "\
fragment commitFields on Commit {{
  oid
  additions
  deletions
  committedDate
  author {{ name email user {{ login }} }}
  associatedPullRequests(first: 1) {{
    nodes {{
      files(first: {FILES_PAGE_SIZE}) {{
        nodes {{ path additions deletions changeType }}
      }}
    }}
  }}
}}"
    )
}

/// Selection for one repository's branch refs with a first history page.
fn repo_refs_fields() -> String {
    format!(
        "\
fragment repoRefs on Repository {{
  refs(refPrefix: \"refs/heads/\", first: {REFS_PAGE_SIZE}) {{
    pageInfo {{ endCursor hasNextPage }}
    nodes {{
      name
      target {{
        ... on Commit {{
          history(first: {HISTORY_PAGE_SIZE}, since: $since, until: $until) {{
            pageInfo {{ endCursor hasNextPage }}
            nodes {{ ...commitFields }}
          }}
        }}
      }}
    }}
  }}
}}"
    )
}

/// One batched request: a deterministic alias per repository.
#[derive(Debug, Clone)]
pub struct BatchQuery {
    entries: Vec<(String, RepoRef)>,
}

impl BatchQuery {
    /// Assigns aliases `r0..rN` to the repositories in batch order.
    pub fn new(repos: &[RepoRef]) -> Self {
        let entries = repos
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("r{i}"), r.clone()))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, RepoRef)] {
        &self.entries
    }

    /// Renders the batched document. Owner/name literals are quoted through
    /// the JSON encoder so arbitrary repository names cannot break out of
    /// the query text.
    pub fn document(&self) -> String {
        let mut doc = String::from("query($since: GitTimestamp!, $until: GitTimestamp!) {\n");
        for (alias, repo) in &self.entries {
            doc.push_str(&format!(
                "  {alias}: repository(owner: {}, name: {}) {{ ...repoRefs }}\n",
                quote(&repo.owner),
                quote(&repo.name),
            ));
        }
        doc.push_str("}\n");
        doc.push_str(&repo_refs_fields());
        doc.push('\n');
        doc.push_str(&commit_fields());
        doc
    }

    /// Variables shared by every sub-query of the batch.
    pub fn variables(window: &TimeWindow) -> Value {
        serde_json::json!({
            "since": git_timestamp(&window.since),
            "until": git_timestamp(&window.until),
        })
    }
}

/// Document fetching one further refs page for a single repository.
pub fn refs_page_document() -> String {
    format!(
        "query($owner: String!, $name: String!, $cursor: String, \
$since: GitTimestamp!, $until: GitTimestamp!) {{\n  \
repo: repository(owner: $owner, name: $name) {{\n    \
refs(refPrefix: \"refs/heads/\", first: {REFS_PAGE_SIZE}, after: $cursor) {{\n      \
pageInfo {{ endCursor hasNextPage }}\n      \
nodes {{\n        name\n        target {{\n          ... on Commit {{\n            \
history(first: {HISTORY_PAGE_SIZE}, since: $since, until: $until) {{\n              \
pageInfo {{ endCursor hasNextPage }}\n              nodes {{ ...commitFields }}\n            \
}}\n          }}\n        }}\n      }}\n    }}\n  }}\n}}\n{commit_fields}",
        commit_fields = commit_fields()
    )
}

/// Document fetching one further history page for a single branch.
pub fn history_page_document() -> String {
    format!(
        "query($owner: String!, $name: String!, $branch: String!, $cursor: String, \
$since: GitTimestamp!, $until: GitTimestamp!) {{\n  \
repo: repository(owner: $owner, name: $name) {{\n    \
ref(qualifiedName: $branch) {{\n      name\n      target {{\n        ... on Commit {{\n          \
history(first: {HISTORY_PAGE_SIZE}, after: $cursor, since: $since, until: $until) {{\n            \
pageInfo {{ endCursor hasNextPage }}\n            nodes {{ ...commitFields }}\n          \
}}\n        }}\n      }}\n    }}\n  }}\n}}\n{commit_fields}",
        commit_fields = commit_fields()
    )
}

fn quote(s: &str) -> String {
    // GraphQL string literal escaping matches JSON's.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// ISO-8601 instant with trailing `Z`, as GitTimestamp expects.
pub fn git_timestamp(t: &chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

// ===== Response shape (subset) =====

/// Splits the envelope into per-alias values, tolerating partial `errors`.
///
/// Returns the alias → value map, or an error string when `data` is absent
/// entirely (the whole request then fails as one unit).
pub fn split_envelope(body: Value) -> Result<HashMap<String, Value>, String> {
    let envelope: Envelope = match serde_json::from_value(body) {
        Ok(e) => e,
        Err(e) => return Err(format!("malformed GraphQL envelope: {e}")),
    };

    match envelope.data {
        Some(data) => Ok(data),
        None => {
            let msg = envelope
                .errors
                .unwrap_or_default()
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            Err(if msg.is_empty() {
                "GraphQL response carried no data".to_string()
            } else {
                msg
            })
        }
    }
}

/// Decodes one alias value into a repository node.
///
/// `null` (repository not visible) and shape mismatches both yield `Err`
/// with a reason, which the fetcher records as a failed unit.
pub fn decode_repo_node(alias_value: Value) -> Result<RepoNode, String> {
    match serde_json::from_value::<Option<RepoNode>>(alias_value) {
        Ok(Some(node)) => Ok(node),
        Ok(None) => Err("repository not accessible in GraphQL response".to_string()),
        Err(e) => Err(format!("invalid repository node: {e}")),
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<HashMap<String, Value>>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Aliased repository node: a refs connection for batch/refs-page queries,
/// or a single ref for history-page queries.
#[derive(Debug, Deserialize)]
pub struct RepoNode {
    #[serde(default)]
    pub refs: Option<RefConnection>,
    #[serde(default, rename = "ref")]
    pub single_ref: Option<RefNode>,
}

#[derive(Debug, Deserialize)]
pub struct RefConnection {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<RefNode>>,
}

#[derive(Debug, Deserialize)]
pub struct RefNode {
    pub name: String,
    #[serde(default)]
    pub target: Option<TargetNode>,
}

#[derive(Debug, Deserialize)]
pub struct TargetNode {
    #[serde(default)]
    pub history: Option<HistoryConnection>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryConnection {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<CommitNode>>,
}

#[derive(Debug, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "endCursor", default)]
    pub end_cursor: Option<String>,
    #[serde(rename = "hasNextPage", default)]
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct CommitNode {
    pub oid: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(rename = "committedDate", default)]
    pub committed_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub author: Option<GitActor>,
    #[serde(rename = "associatedPullRequests", default)]
    pub associated_pull_requests: Option<PrConnection>,
}

#[derive(Debug, Deserialize)]
pub struct GitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
pub struct UserNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct PrConnection {
    #[serde(default)]
    pub nodes: Vec<Option<PrNode>>,
}

#[derive(Debug, Deserialize)]
pub struct PrNode {
    #[serde(default)]
    pub files: Option<FileConnection>,
}

#[derive(Debug, Deserialize)]
pub struct FileConnection {
    #[serde(default)]
    pub nodes: Vec<Option<PrFileNode>>,
}

#[derive(Debug, Deserialize)]
pub struct PrFileNode {
    pub path: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(rename = "changeType", default)]
    pub change_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    fn repos(n: usize) -> Vec<RepoRef> {
        (0..n)
            .map(|i| RepoRef {
                owner: "acme".into(),
                name: format!("repo{i}"),
            })
            .collect()
    }

    #[test]
    fn aliases_are_deterministic_and_ordered() {
        let batch = BatchQuery::new(&repos(3));
        let aliases: Vec<&str> = batch.entries().iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(aliases, vec!["r0", "r1", "r2"]);
        assert_eq!(batch.entries()[1].1.name, "repo1");
    }

    #[test]
    fn document_contains_each_alias_once() {
        let batch = BatchQuery::new(&repos(2));
        let doc = batch.document();
        assert!(doc.contains("r0: repository(owner: \"acme\", name: \"repo0\")"));
        assert!(doc.contains("r1: repository(owner: \"acme\", name: \"repo1\")"));
        assert!(doc.contains("fragment repoRefs on Repository"));
        assert!(doc.contains("fragment commitFields on Commit"));
    }

    #[test]
    fn documents_carry_configured_page_sizes() {
        let doc = BatchQuery::new(&repos(1)).document();
        assert!(doc.contains(&format!("refs(refPrefix: \"refs/heads/\", first: {REFS_PAGE_SIZE})")));
        assert!(doc.contains(&format!("history(first: {HISTORY_PAGE_SIZE},")));
        assert!(doc.contains(&format!("files(first: {FILES_PAGE_SIZE})")));

        assert!(refs_page_document().contains(&format!("first: {REFS_PAGE_SIZE}, after: $cursor")));
        assert!(history_page_document()
            .contains(&format!("history(first: {HISTORY_PAGE_SIZE}, after: $cursor")));
    }

    #[test]
    fn repo_names_are_escaped() {
        let weird = vec![RepoRef {
            owner: "a\"b".into(),
            name: "n".into(),
        }];
        let doc = BatchQuery::new(&weird).document();
        assert!(doc.contains(r#"owner: "a\"b""#));
    }

    #[test]
    fn window_variables_use_trailing_z() {
        let window = TimeWindow {
            since: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
        };
        let vars = BatchQuery::variables(&window);
        assert_eq!(vars["since"], "2024-01-01T00:00:00Z");
        assert_eq!(vars["until"], "2024-01-31T23:59:59Z");
    }

    #[test]
    fn envelope_splitting() {
        let body = serde_json::json!({
            "data": { "r0": { "refs": { "pageInfo": { "hasNextPage": false }, "nodes": [] } } }
        });
        let map = split_envelope(body).unwrap();
        assert!(map.contains_key("r0"));

        let failed = serde_json::json!({
            "errors": [ { "message": "rate limit exceeded" } ]
        });
        let err = split_envelope(failed).unwrap_err();
        assert!(err.contains("rate limit"));
    }

    #[test]
    fn null_repo_node_is_a_unit_failure() {
        assert!(decode_repo_node(Value::Null).is_err());
        // Wrong field type fails as a unit too, not as a crash.
        let bad = serde_json::json!({ "refs": "not-an-object" });
        assert!(decode_repo_node(bad).is_err());
    }
}
