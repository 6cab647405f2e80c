//! Cross-origin detail page fetching.
//!
//! The content script cannot read other origins itself; a privileged
//! background context performs the request and answers a small JSON message.
//! [`PageFetcher`] is the contract the resolver depends on, [`HttpFetcher`]
//! is the native implementation, and [`serve_fetch_request`] adapts any
//! fetcher to the message protocol.

use crate::config::AppConfig;
use crate::error::TransportError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, TransportError>;
}

/// reqwest-backed fetcher with an optional cookie jar standing in for
/// browser credentials.
pub struct HttpFetcher {
    client: reqwest::Client,
    accept: String,
}

impl HttpFetcher {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(config.include_credentials)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            accept: config.accept.clone(),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, TransportError> {
        debug!(%url, "Fetching detail page");
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, &self.accept)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))
    }
}

/// Message sent by the content script to the background context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum FetchRequest {
    Fetch { url: String },
}

/// Reply to a [`FetchRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FetchResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

impl FetchResponse {
    /// Fold a reply back into the fetcher contract.
    pub fn into_result(self) -> Result<String, TransportError> {
        match (self.success, self.html) {
            (true, Some(html)) => Ok(html),
            _ => Err(TransportError::Network(
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}

pub async fn serve_fetch_request(fetcher: &dyn PageFetcher, request: FetchRequest) -> FetchResponse {
    match request {
        FetchRequest::Fetch { url } => match fetcher.fetch_page(&url).await {
            Ok(html) => FetchResponse {
                success: true,
                html: Some(html),
                error: None,
            },
            Err(err) => {
                warn!(%url, "Background fetch failed: {err}");
                FetchResponse {
                    success: false,
                    html: None,
                    error: Some(err.to_string()),
                }
            }
        },
    }
}
