//! HTTP adapter for the chat service backend API.

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::Deserialize;

use crate::application::ports::{ConversationLister, ConversationSource, SessionTokenProvider};
use crate::domain::settings::ApiConfig;
use crate::domain::{
    AppError, ConversationPage, ConversationRef, RawConversationGraph, Result, Token, PAGE_SIZE,
};

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    id: String,
}

/// Client for the conversation listing and retrieval endpoints.
#[derive(Clone, Debug)]
pub struct ChatApiClient {
    http: Client,
    base_url: String,
}

impl ChatApiClient {
    /// Build a client from the API settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(AppError::http)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn session_url(&self) -> String {
        format!("{}/api/auth/session", self.base_url)
    }

    fn list_url(&self, offset: u64) -> String {
        format!(
            "{}/backend-api/conversations?offset={offset}&limit={PAGE_SIZE}",
            self.base_url
        )
    }

    fn conversation_url(&self, id: &str) -> String {
        format!("{}/backend-api/conversation/{id}", self.base_url)
    }
}

#[async_trait]
impl ConversationLister for ChatApiClient {
    async fn list_page(&self, token: &Token, offset: u64) -> Result<ConversationPage> {
        let list_error = |message: String| AppError::List { offset, message };

        let response = self
            .http
            .get(self.list_url(offset))
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| list_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(list_error(format!("HTTP {status}")));
        }

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| list_error(e.to_string()))?;

        Ok(into_page(body, offset))
    }
}

#[async_trait]
impl ConversationSource for ChatApiClient {
    async fn get_conversation(&self, token: &Token, id: &str) -> Result<RawConversationGraph> {
        let response = self
            .http
            .get(self.conversation_url(id))
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(AppError::http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::InvalidData {
                message: format!("Unsuccessful response: HTTP {status}"),
            });
        }

        response.json().await.map_err(AppError::http)
    }
}

fn into_page(body: ListResponse, offset: u64) -> ConversationPage {
    ConversationPage {
        items: body
            .items
            .into_iter()
            .map(|item| ConversationRef {
                id: item.id,
                offset,
            })
            .collect(),
        total: body.total,
    }
}

fn token_from_session(body: SessionResponse) -> Result<Token> {
    body.access_token
        .filter(|t| !t.is_empty())
        .map(Token::new)
        .ok_or_else(|| AppError::Token {
            message: "session response has no accessToken".into(),
        })
}

/// Fetches the bearer token once from the session endpoint.
pub struct SessionEndpointProvider {
    client: ChatApiClient,
    cookie: Option<String>,
}

impl SessionEndpointProvider {
    #[must_use]
    pub const fn new(client: ChatApiClient, cookie: Option<String>) -> Self {
        Self { client, cookie }
    }
}

#[async_trait]
impl SessionTokenProvider for SessionEndpointProvider {
    async fn token(&self) -> Result<Token> {
        let mut request = self.client.http.get(self.client.session_url());
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.as_str());
        }

        let response = request.send().await.map_err(|e| AppError::Token {
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Token {
                message: format!("HTTP {status}"),
            });
        }

        let body: SessionResponse = response.json().await.map_err(|e| AppError::Token {
            message: e.to_string(),
        })?;

        tracing::debug!("Session token acquired");
        token_from_session(body)
    }
}

/// A token supplied directly by the user.
pub struct StaticTokenProvider(Token);

impl StaticTokenProvider {
    #[must_use]
    pub const fn new(token: Token) -> Self {
        Self(token)
    }
}

#[async_trait]
impl SessionTokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<Token> {
        Ok(self.0.clone())
    }
}
