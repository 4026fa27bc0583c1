//! GitHub contents API adapter for remote publication.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::application::ports::{ContentStore, UpsertRequest};
use crate::domain::{AppError, Result, Token};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct FileResponse {
    #[serde(default)]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(default)]
    content: Option<FileResponse>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Content store backed by `PUT /repos/{repo}/contents/{path}`.
#[derive(Clone, Debug)]
pub struct GitHubContents {
    http: Client,
    api_base: String,
}

impl GitHubContents {
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(api_base: &str, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(AppError::http)?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn contents_url(&self, repo: &str, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            repo.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder, credentials: &Token) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", credentials.as_str()))
            .header(ACCEPT, GITHUB_ACCEPT)
    }
}

#[async_trait]
impl ContentStore for GitHubContents {
    async fn read_version(
        &self,
        credentials: &Token,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>> {
        let request = self
            .http
            .get(self.contents_url(repo, path))
            .query(&[("ref", branch)]);

        let response = self
            .authorized(request, credentials)
            .send()
            .await
            .map_err(AppError::http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::debug!(%status, path, "Version lookup unsuccessful");
            return Ok(None);
        }

        let file: FileResponse = response.json().await.map_err(AppError::http)?;
        Ok(file.sha)
    }

    async fn upsert(
        &self,
        credentials: &Token,
        repo: &str,
        path: &str,
        request: &UpsertRequest,
    ) -> Result<Option<String>> {
        let builder = self.http.put(self.contents_url(repo, path)).json(request);

        let response = self
            .authorized(builder, credentials)
            .send()
            .await
            .map_err(AppError::http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Publish {
                message: error_message(&body, status),
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(path, error = %err, "Upsert succeeded but body could not be read");
                return Ok(None);
            }
        };
        Ok(version_from_upsert(&body, path))
    }
}

/// New `content.sha` from a successful upsert body; `None` if it is unreadable.
fn version_from_upsert(body: &str, path: &str) -> Option<String> {
    match serde_json::from_str::<UpsertResponse>(body) {
        Ok(parsed) => parsed.content.and_then(|c| c.sha),
        Err(err) => {
            tracing::warn!(path, error = %err, "Upsert succeeded but response was not understood");
            None
        }
    }
}

/// The remote's `message` field, or the status line when absent.
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| status.to_string())
}
