//! Repository directory: organization listing, explicit lists and probing.
//!
//! Repositories that fail the existence probe are dropped with a recorded
//! reason (soft failure); an empty valid set after probing is fatal for the
//! run and is raised by the caller.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::StatsEngineResult;
use crate::github::GitHubClient;
use crate::model::{DroppedRepository, RepoRef};

/// Lists every repository under an organization, following the REST
/// `Link: rel="next"` protocol until exhausted.
pub async fn list_org_repos(
    client: &GitHubClient,
    org: &str,
) -> StatsEngineResult<Vec<RepoRef>> {
    let mut repos = Vec::new();
    let mut url = Some(format!(
        "{}/orgs/{}/repos?per_page=100",
        client.rest_base(),
        urlencoding::encode(org)
    ));

    while let Some(current) = url.take() {
        debug!(url = %current, "listing org repositories");

        let resp = client.rest_get(&current).await?.error_for_status()?;
        let next = next_page_url(
            resp.headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok()),
        );

        let page: Vec<OrgRepo> = resp.json().await?;
        for repo in page {
            match RepoRef::parse(&repo.full_name) {
                Some(r) => repos.push(r),
                None => warn!(full_name = %repo.full_name, "skipping unparseable repo name"),
            }
        }

        url = next;
    }

    debug!(count = repos.len(), org, "organization listing complete");
    Ok(repos)
}

/// Parses an explicit repository list: one `owner/name` per line, blank
/// lines and `#`/`;` comment lines removed. Unparseable lines are reported
/// as dropped rather than aborting the run.
pub fn parse_repo_list(text: &str) -> (Vec<RepoRef>, Vec<DroppedRepository>) {
    let mut repos = Vec::new();
    let mut dropped = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        match RepoRef::parse(line) {
            Some(r) => repos.push(r),
            None => dropped.push(DroppedRepository {
                repo: line.to_string(),
                reason: "not in owner/name form".to_string(),
            }),
        }
    }

    (repos, dropped)
}

/// Probes each candidate with a cheap existence check.
///
/// Returns the surviving repositories and the dropped ones with reasons.
/// All failures here are soft; deciding whether an empty survivor set is
/// fatal belongs to the caller.
pub async fn probe_repositories(
    client: &GitHubClient,
    candidates: Vec<RepoRef>,
) -> (Vec<RepoRef>, Vec<DroppedRepository>) {
    let mut valid = Vec::with_capacity(candidates.len());
    let mut dropped = Vec::new();

    for repo in candidates {
        let url = format!(
            "{}/repos/{}/{}",
            client.rest_base(),
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name)
        );

        let outcome = match client.rest_head(&url).await {
            Ok(resp) => resp.error_for_status().map(|_| ()).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(()) => valid.push(repo),
            Err(reason) => {
                warn!(repo = %repo, %reason, "skipping repository");
                dropped.push(DroppedRepository {
                    repo: repo.full_name(),
                    reason,
                });
            }
        }
    }

    (valid, dropped)
}

/// Extracts the `rel="next"` target from a `Link` header value, if any.
fn next_page_url(link_header: Option<&str>) -> Option<String> {
    let header = link_header?;
    for part in header.split(',') {
        let Some((url_part, params)) = part.trim().split_once(';') else {
            continue;
        };
        if params.contains("rel=\"next\"") {
            return Some(url_part.trim().trim_matches(['<', '>']).to_string());
        }
    }
    None
}

/// Organization repository listing entry (subset).
#[derive(Debug, Deserialize)]
struct OrgRepo {
    full_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_link_extraction() {
        let header = "<https://api.github.com/orgs/acme/repos?page=2>; rel=\"next\", \
                      <https://api.github.com/orgs/acme/repos?page=5>; rel=\"last\"";
        assert_eq!(
            next_page_url(Some(header)).as_deref(),
            Some("https://api.github.com/orgs/acme/repos?page=2")
        );

        let last_only = "<https://api.github.com/orgs/acme/repos?page=5>; rel=\"last\"";
        assert_eq!(next_page_url(Some(last_only)), None);
        assert_eq!(next_page_url(None), None);
    }

    #[test]
    fn repo_list_parsing_strips_comments_and_blanks() {
        let text = "\
# tracked repositories
acme/widgets

; temporarily disabled
acme/gadgets
not-a-repo
  acme/tools
";
        let (repos, dropped) = parse_repo_list(text);
        let names: Vec<String> = repos.iter().map(|r| r.full_name()).collect();
        assert_eq!(names, vec!["acme/widgets", "acme/gadgets", "acme/tools"]);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].repo, "not-a-repo");
    }
}
