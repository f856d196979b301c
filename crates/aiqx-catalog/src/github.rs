//! GitHub-hosted pack catalog.
//!
//! Listing uses the git trees API on the configured branch; documents are
//! fetched from the raw file host.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use aiqx_core::traits::{CatalogEntry, PackSource};

use crate::config::CatalogConfig;
use crate::error::FetchError;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("aiqx/", env!("CARGO_PKG_VERSION"));
/// Used when a rate-limited response carries no retry hint.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Pack catalog backed by a GitHub repository.
pub struct GitHubSource {
    owner: String,
    repo: String,
    branch: String,
    pack_prefix: String,
    api_base: String,
    raw_base: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubSource {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        let trim = |s: &str| s.trim_end_matches('/').to_string();
        Ok(Self {
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            pack_prefix: config.pack_prefix.clone(),
            api_base: trim(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)),
            raw_base: trim(config.raw_base.as_deref().unwrap_or(DEFAULT_RAW_BASE)),
            token: config.token.clone(),
            client,
        })
    }

    fn tree_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base, self.owner, self.repo, self.branch
        )
    }

    fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base, self.owner, self.repo, self.branch, path
        )
    }

    async fn get(&self, url: &str, api: bool) -> Result<reqwest::Response, FetchError> {
        let mut request = self.client.get(url);
        if api {
            request = request.header("accept", "application/vnd.github+json");
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                FetchError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 || (status == 403 && rate_limit_exhausted(&response)) {
            return Err(FetchError::RateLimited {
                retry_after_ms: retry_after_secs(response.headers(), Utc::now()) * 1000,
            });
        }
        if status == 404 {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GitHubError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(FetchError::ApiError { status, message });
        }
        Ok(response)
    }
}

fn rate_limit_exhausted(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "0")
}

/// Seconds to wait before retrying: `retry-after` if present, else the time
/// until `x-ratelimit-reset` (epoch seconds), at least one second.
fn retry_after_secs(headers: &HeaderMap, now: DateTime<Utc>) -> u64 {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };
    if let Some(secs) = header("retry-after") {
        return secs.max(0) as u64;
    }
    match header("x-ratelimit-reset") {
        Some(reset) => (reset - now.timestamp()).max(1) as u64,
        None => DEFAULT_RETRY_AFTER_SECS,
    }
}

#[derive(Deserialize)]
struct GitHubError {
    message: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type", default = "default_item_type")]
    item_type: String,
    #[serde(default)]
    size: Option<u64>,
}

fn default_item_type() -> String {
    "blob".to_string()
}

#[async_trait]
impl PackSource for GitHubSource {
    fn name(&self) -> &str {
        "github"
    }

    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo, branch = %self.branch))]
    async fn list(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        let response = self.get(&self.tree_url(), true).await?;
        let tree: TreeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidDocument(format!("failed to parse tree listing: {e}")))?;

        if tree.truncated {
            tracing::warn!("tree listing was truncated by the server");
        }

        let entries: Vec<CatalogEntry> = tree
            .tree
            .into_iter()
            .filter(|item| {
                item.item_type == "blob"
                    && item.path.starts_with(&self.pack_prefix)
                    && item.path.ends_with(".json")
            })
            .map(|item| CatalogEntry {
                size: item.size,
                ..CatalogEntry::new(item.path)
            })
            .collect();
        tracing::info!(count = entries.len(), "listed remote packs");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, path: &str) -> anyhow::Result<Value> {
        let response = self.get(&self.raw_url(path), false).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;
        let value = serde_json::from_str(&body)
            .map_err(|e| FetchError::InvalidDocument(format!("{path}: {e}")))?;
        tracing::debug!(path, bytes = body.len(), "fetched remote document");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> GitHubSource {
        let config = CatalogConfig {
            api_base: Some(server.uri()),
            raw_base: Some(format!("{}/raw/", server.uri())),
            ..CatalogConfig::default()
        };
        GitHubSource::new(&config).unwrap()
    }

    #[tokio::test]
    async fn lists_json_blobs_under_prefix() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "sha": "abc",
            "tree": [
                {"path": "README.md", "type": "blob", "size": 10},
                {"path": "Test-Packs", "type": "tree"},
                {"path": "Test-Packs/core.json", "type": "blob", "size": 2048},
                {"path": "Test-Packs/notes.txt", "type": "blob"},
                {"path": "Test-Packs/Community-Packs/poetry.json", "type": "blob"},
                {"path": "Other/elsewhere.json", "type": "blob"}
            ],
            "truncated": false
        });

        Mock::given(method("GET"))
            .and(path("/repos/BLGardner/aiq-x/git/trees/main"))
            .and(query_param("recursive", "1"))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let entries = source(&server).list().await.unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["Test-Packs/core.json", "Test-Packs/Community-Packs/poetry.json"]
        );
        assert!(!entries[0].community);
        assert_eq!(entries[0].size, Some(2048));
        assert!(entries[1].community);
    }

    #[tokio::test]
    async fn fetches_raw_document() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/raw/BLGardner/aiq-x/main/Test-Packs/core.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"id":"core","version":"1","tiers":{}}"#),
            )
            .mount(&server)
            .await;

        let source = source(&server);
        let doc = source.fetch("Test-Packs/core.json").await.unwrap();
        assert_eq!(doc["id"], "core");

        let pack = source.fetch_pack("Test-Packs/core.json").await.unwrap();
        assert_eq!(pack.name, "Unnamed Pack (core)");
    }

    #[tokio::test]
    async fn sends_token_when_configured() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("authorization", "Bearer ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"tree": []})))
            .mount(&server)
            .await;

        let config = CatalogConfig {
            api_base: Some(server.uri()),
            token: Some("ghp_test".into()),
            ..CatalogConfig::default()
        };
        let entries = GitHubSource::new(&config).unwrap().list().await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("404: Not Found"))
            .mount(&server)
            .await;

        let err = source(&server).fetch("Test-Packs/missing.json").await.unwrap_err();
        let fetch = err.downcast_ref::<FetchError>().unwrap();
        assert!(matches!(fetch, FetchError::NotFound(_)));
        assert!(fetch.is_permanent());
    }

    #[tokio::test]
    async fn rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("retry-after", "7")
                    .set_body_json(serde_json::json!({"message": "API rate limit exceeded"})),
            )
            .mount(&server)
            .await;

        let err = source(&server).list().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::RateLimited { retry_after_ms: 7000 })
        ));
    }

    #[tokio::test]
    async fn rate_limit_reset_header_sets_delay() {
        let server = MockServer::start().await;
        let reset = Utc::now().timestamp() + 120;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", reset.to_string().as_str())
                    .set_body_json(serde_json::json!({"message": "API rate limit exceeded"})),
            )
            .mount(&server)
            .await;

        let err = source(&server).list().await.unwrap_err();
        let Some(FetchError::RateLimited { retry_after_ms }) = err.downcast_ref::<FetchError>()
        else {
            panic!("expected a rate limit error, got {err}");
        };
        assert!((110_000..=120_000).contains(retry_after_ms), "{retry_after_ms}");
    }

    #[test]
    fn retry_hint_precedence() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
            let mut map = HeaderMap::new();
            for (name, value) in pairs {
                map.insert(*name, value.parse().unwrap());
            }
            map
        }

        assert_eq!(retry_after_secs(&headers(&[]), now), DEFAULT_RETRY_AFTER_SECS);
        assert_eq!(
            retry_after_secs(&headers(&[("x-ratelimit-reset", "1700000045")]), now),
            45
        );
        assert_eq!(
            retry_after_secs(
                &headers(&[("retry-after", "7"), ("x-ratelimit-reset", "1700000045")]),
                now
            ),
            7
        );
        // A reset time already passed still waits a moment.
        assert_eq!(
            retry_after_secs(&headers(&[("x-ratelimit-reset", "1699999990")]), now),
            1
        );
        assert_eq!(
            retry_after_secs(&headers(&[("retry-after", "soon")]), now),
            DEFAULT_RETRY_AFTER_SECS
        );
    }

    #[tokio::test]
    async fn api_error_message_is_extracted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(serde_json::json!({"message": "Git Repository is empty."})),
            )
            .mount(&server)
            .await;

        let err = source(&server).list().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "API error (HTTP 409): Git Repository is empty."
        );
    }

    #[tokio::test]
    async fn invalid_json_document() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = source(&server).fetch("Test-Packs/x.json").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::InvalidDocument(_))
        ));
    }
}
