//! HTTP client for the hub endpoints.
//!
//! [`HubApi`] is the seam the controller talks to; [`HubClient`] implements
//! it over `reqwest`. Every method issues exactly one request and never
//! retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::types::{
    ChatHistory, ChatReply, ClassificationResult, ClearHistoryResponse, HealthResponse,
    SentimentResult, SessionList,
};
use crate::upload::StagedImage;

/// A single chat turn as sent to `POST /chat`.
#[derive(Debug, Clone, Copy)]
pub struct ChatTurn<'a> {
    /// Trimmed message text; may be empty when an image is attached.
    pub message: &'a str,
    /// Session the turn belongs to.
    pub session_id: &'a str,
    /// Optional image attachment.
    pub image: Option<&'a StagedImage>,
}

/// Remote operations used by the front end.
#[async_trait]
pub trait HubApi: Send + Sync {
    /// `GET /health`. Any non-2xx status is an error.
    async fn health(&self) -> Result<HealthResponse>;

    /// `POST /predict` with the image as multipart field `file`.
    async fn classify(&self, image: &StagedImage) -> Result<ClassificationResult>;

    /// `GET /sentiment_analysis?text=...`.
    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentResult>;

    /// `POST /chat` with multipart fields `message`, `session_id`, `image`.
    async fn chat(&self, turn: ChatTurn<'_>) -> Result<ChatReply>;

    /// `DELETE /chat/history/{session_id}`.
    async fn clear_history(&self, session_id: &str) -> Result<ClearHistoryResponse>;

    /// `GET /chat/history/{session_id}`.
    async fn history(&self, session_id: &str) -> Result<ChatHistory>;

    /// `GET /chat/sessions`.
    async fn sessions(&self) -> Result<SessionList>;
}

/// `reqwest`-backed [`HubApi`].
///
/// # Example
///
/// ```rust,no_run
/// use multimodal_hub::client::{HubApi, HubClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HubClient::new("http://localhost:8000")?;
/// let result = client.analyze_sentiment("what a lovely day").await?;
/// println!("{} {:.4}", result.sentiment.label, result.sentiment.score);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HubClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HubClient {
    /// Create a client with default `reqwest` settings.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client with a custom `reqwest` client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(Self { base_url, http })
    }

    /// Create a client from the `[server]` config section.
    pub fn from_config(server: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(server.timeout_secs))
            .build()?;
        Self::with_client(&server.base_url, http)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Build an endpoint URL under the base, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `with_client`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn image_part(image: &StagedImage) -> Result<Part> {
        Ok(Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime())?)
    }
}

#[async_trait]
impl HubApi for HubClient {
    async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint(&["health"]);
        tracing::debug!(name: "hub.request", method = "GET", %url, "Probing server health");

        let response = Self::check_status(self.http.get(url).send().await?).await?;
        // Some servers answer 2xx with an empty or non-JSON body.
        Ok(response.json().await.unwrap_or_default())
    }

    async fn classify(&self, image: &StagedImage) -> Result<ClassificationResult> {
        let url = self.endpoint(&["predict"]);
        tracing::debug!(
            name: "hub.request",
            method = "POST",
            %url,
            file = %image.file_name(),
            size = image.size(),
            "Uploading image for classification"
        );

        let form = Form::new().part("file", Self::image_part(image)?);
        let response = self.http.post(url).multipart(form).send().await?;
        Self::handle_response(response).await
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentResult> {
        let url = self.endpoint(&["sentiment_analysis"]);
        tracing::debug!(
            name: "hub.request",
            method = "GET",
            %url,
            chars = text.chars().count(),
            "Requesting sentiment analysis"
        );

        let response = self
            .http
            .get(url)
            .query(&[("text", text)])
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn chat(&self, turn: ChatTurn<'_>) -> Result<ChatReply> {
        let url = self.endpoint(&["chat"]);
        tracing::debug!(
            name: "hub.request",
            method = "POST",
            %url,
            session_id = %turn.session_id,
            has_image = turn.image.is_some(),
            "Sending chat turn"
        );

        let mut form = Form::new()
            .text("message", turn.message.to_string())
            .text("session_id", turn.session_id.to_string());
        if let Some(image) = turn.image {
            form = form.part("image", Self::image_part(image)?);
        }

        let response = self.http.post(url).multipart(form).send().await?;
        Self::handle_response(response).await
    }

    async fn clear_history(&self, session_id: &str) -> Result<ClearHistoryResponse> {
        let url = self.endpoint(&["chat", "history", session_id]);
        tracing::debug!(name: "hub.request", method = "DELETE", %url, "Clearing chat history");

        let response = Self::check_status(self.http.delete(url).send().await?).await?;
        Ok(response.json().await.unwrap_or_default())
    }

    async fn history(&self, session_id: &str) -> Result<ChatHistory> {
        let url = self.endpoint(&["chat", "history", session_id]);
        tracing::debug!(name: "hub.request", method = "GET", %url, "Fetching chat history");

        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    async fn sessions(&self) -> Result<SessionList> {
        let url = self.endpoint(&["chat", "sessions"]);
        tracing::debug!(name: "hub.request", method = "GET", %url, "Listing chat sessions");

        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_under_base_path() {
        let client = HubClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.endpoint(&["health"]).as_str(),
            "http://localhost:8000/health"
        );

        let client = HubClient::new("http://example.com/hub/").unwrap();
        assert_eq!(
            client.endpoint(&["chat", "history", "session_1_abc"]).as_str(),
            "http://example.com/hub/chat/history/session_1_abc"
        );
    }

    #[test]
    fn session_segment_is_escaped() {
        let client = HubClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.endpoint(&["chat", "history", "a/b c"]).as_str(),
            "http://localhost:8000/chat/history/a%2Fb%20c"
        );
    }

    #[test]
    fn rejects_bad_base_urls() {
        assert!(matches!(
            HubClient::new("not a url"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            HubClient::new("mailto:someone@example.com"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
