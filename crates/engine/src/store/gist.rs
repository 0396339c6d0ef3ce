//! GitHub Gist backend.
//!
//! All documents are files of one gist. The gist history version is the
//! revision: it changes on every write to any file, so a write is refused
//! when the gist moved since the read. GitHub has no conditional PATCH, so
//! the version is re-checked right before patching; two processes can
//! still interleave inside that window.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;

use super::{DocumentStore, Revision, Snapshot};
use crate::{Document, EngineError, ResultEngine};

const GITHUB_API: &str = "https://api.github.com";
const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct GistStore {
    client: Client,
    api_url: String,
    gist_id: String,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistHistory {
    version: String,
}

#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    files: HashMap<String, Option<GistFile>>,
    #[serde(default)]
    history: Vec<GistHistory>,
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistCommit {
    version: String,
}

impl Gist {
    fn revision(&self) -> Revision {
        match (self.history.first(), &self.updated_at) {
            (Some(h), _) => Revision::new(h.version.clone()),
            (None, Some(updated_at)) => Revision::new(updated_at.clone()),
            (None, None) => Revision::new(""),
        }
    }

    fn file(&self, doc: Document) -> Option<&GistFile> {
        self.files.get(doc.file_name()).and_then(Option::as_ref)
    }
}

impl GistStore {
    pub fn new(gist_id: &str, token: &str) -> ResultEngine<Self> {
        let mut auth = header::HeaderValue::try_from(format!("token {token}"))
            .map_err(|err| EngineError::Store(format!("invalid gist token: {err}")))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("vietqr-shop/", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_url: GITHUB_API.to_string(),
            gist_id: gist_id.to_string(),
        })
    }

    /// Points the client at another API root (GitHub Enterprise, tests).
    pub fn api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    fn gist_url(&self) -> String {
        format!("{}/gists/{}", self.api_url, self.gist_id)
    }

    async fn fetch(&self) -> ResultEngine<Gist> {
        let resp = self.client.get(self.gist_url()).send().await?;
        ensure_success(resp).await?.json::<Gist>().await.map_err(Into::into)
    }

    async fn current_revision(&self) -> ResultEngine<Revision> {
        let resp = self
            .client
            .get(format!("{}/commits?per_page=1", self.gist_url()))
            .send()
            .await?;
        let commits: Vec<GistCommit> = ensure_success(resp).await?.json().await?;
        match commits.into_iter().next() {
            Some(commit) => Ok(Revision::new(commit.version)),
            None => Ok(self.fetch().await?.revision()),
        }
    }
}

#[async_trait]
impl DocumentStore for GistStore {
    async fn read(&self, doc: Document) -> ResultEngine<Snapshot> {
        let gist = self.fetch().await?;
        let revision = gist.revision();

        let content = match gist.file(doc) {
            None => None,
            Some(file) if file.truncated => match &file.raw_url {
                Some(raw_url) => {
                    tracing::debug!("{doc} is truncated, fetching raw content");
                    let resp = self.client.get(raw_url).send().await?;
                    Some(ensure_success(resp).await?.text().await?)
                }
                None => file.content.clone(),
            },
            Some(file) => file.content.clone(),
        };

        Ok(Snapshot { revision, content })
    }

    async fn write(
        &self,
        doc: Document,
        expected: &Revision,
        content: String,
    ) -> ResultEngine<Revision> {
        let current = self.current_revision().await?;
        if &current != expected {
            return Err(EngineError::Conflict(doc.to_string()));
        }

        let payload = serde_json::json!({
            "files": { doc.file_name(): { "content": content } }
        });
        let resp = self
            .client
            .patch(self.gist_url())
            .json(&payload)
            .send()
            .await?;
        let gist: Gist = ensure_success(resp).await?.json().await?;
        Ok(gist.revision())
    }
}

async fn ensure_success(resp: reqwest::Response) -> ResultEngine<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    tracing::debug!("gist api answered {status}: {body}");
    Err(match status {
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
            EngineError::Conflict("gist".to_string())
        }
        _ => EngineError::Store(format!("gist api answered {status}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "abc",
        "files": {
            "users.json": {"filename": "users.json", "content": "{\"1\": {\"joined\": true}}", "truncated": false, "raw_url": "https://gist.example/raw/users.json"},
            "orders.json": {"filename": "orders.json", "content": "{", "truncated": true, "raw_url": "https://gist.example/raw/orders.json"}
        },
        "history": [{"version": "v2"}, {"version": "v1"}],
        "updated_at": "2025-01-01T00:00:00Z"
    }"#;

    #[test]
    fn revision_is_latest_history_version() {
        let gist: Gist = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(gist.revision(), Revision::new("v2"));
    }

    #[test]
    fn revision_falls_back_to_updated_at() {
        let gist: Gist =
            serde_json::from_str(r#"{"files": {}, "updated_at": "2025-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(gist.revision(), Revision::new("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn files_are_looked_up_by_document_name() {
        let gist: Gist = serde_json::from_str(SAMPLE).unwrap();
        let users = gist.file(Document::Users).unwrap();
        assert!(!users.truncated);
        assert_eq!(users.content.as_deref(), Some("{\"1\": {\"joined\": true}}"));
        assert!(gist.file(Document::Orders).unwrap().truncated);
        assert!(gist.file(Document::Sessions).is_none());
    }

    #[test]
    fn deleted_files_deserialize_as_absent() {
        let gist: Gist = serde_json::from_str(r#"{"files": {"sessions.json": null}}"#).unwrap();
        assert!(gist.file(Document::Sessions).is_none());
    }

    #[test]
    fn custom_api_url_is_trimmed() {
        let store = GistStore::new("abc", "t").unwrap().api_url("http://localhost:9/");
        assert_eq!(store.gist_url(), "http://localhost:9/gists/abc");
    }
}
