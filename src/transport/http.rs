//! Transport backed by an HTTP bridge process.
//!
//! The bridge owns the real messaging session (login, wire protocol, E2EE
//! keys) and exposes the operations the core needs as JSON endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{Transport, TransportError, TransportResult};
use crate::config::TransportConfig;
use crate::message::{Contact, ContentMetadata, InboundEvent, Message};

#[derive(Debug, Deserialize)]
struct SessionResponse {
    mid: String,
}

#[derive(Debug, Deserialize)]
struct TimeResponse {
    time: i64,
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextRequest<'a> {
    to: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_metadata: Option<&'a ContentMetadata>,
    e2ee: bool,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    to: &'a str,
    path: &'a str,
    e2ee: bool,
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    poll_timeout: Duration,
    mid: String,
}

impl HttpTransport {
    /// Open a session on the bridge with the configured device profile
    pub async fn connect(config: &TransportConfig) -> TransportResult<Self> {
        let poll_timeout = Duration::from_secs(config.poll_timeout_secs);
        let client = reqwest::Client::builder()
            // Long polls must outlive the bridge-side wait
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let mut transport = Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_timeout,
            mid: String::new(),
        };

        let session: SessionResponse = transport
            .post("/session", &json!({ "device": config.device }))
            .await?;
        info!("Session opened as {} ({})", session.mid, config.device);
        transport.mid = session.mid;

        Ok(transport)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> TransportResult<T> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Self::decode(path, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> TransportResult<T> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Self::decode(path, response).await
    }

    /// POST where only the status matters
    async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> TransportResult<()> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Self::check_status(path, response).await.map(|_| ())
    }

    async fn check_status(
        path: &str,
        response: reqwest::Response,
    ) -> TransportResult<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> TransportResult<T> {
        Self::check_status(path, response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn self_mid(&self) -> &str {
        &self.mid
    }

    async fn poll_events(&self) -> TransportResult<Vec<InboundEvent>> {
        self.get(&format!("/ops?timeout={}", self.poll_timeout.as_secs()))
            .await
    }

    async fn server_time(&self) -> TransportResult<i64> {
        let response: TimeResponse = self.get("/time").await?;
        Ok(response.time)
    }

    async fn send_contact(&self, to: &str, mid: &str, display_name: &str) -> TransportResult<()> {
        self.post_unit(
            "/contacts/send",
            &json!({ "to": to, "mid": mid, "displayName": display_name }),
        )
        .await
    }

    async fn get_contact(&self, mid: &str) -> TransportResult<Contact> {
        // The mid comes from user text, so it must stay one path segment
        let url = segment_url(&self.base_url, &["contacts", mid])?;
        let path = url.path().to_string();
        debug!("GET {}", path);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Self::decode(&path, response).await
    }

    async fn e2ee_self_key(&self) -> TransportResult<()> {
        let response = self
            .client
            .get(self.url("/e2ee/self-key"))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Self::check_status("/e2ee/self-key", response)
            .await
            .map(|_| ())
    }

    async fn register_e2ee_self_key(&self) -> TransportResult<()> {
        self.post_unit("/e2ee/self-key", &json!({ "mid": self.mid }))
            .await
    }

    async fn decrypt_e2ee_text(&self, message: &Message) -> TransportResult<String> {
        let response: DecryptResponse = self
            .post("/e2ee/decrypt", &json!({ "message": message }))
            .await
            .map_err(|e| match e {
                TransportError::Status { body, .. } => TransportError::Decryption(body),
                other => other,
            })?;
        Ok(response.text)
    }

    async fn send_text(
        &self,
        to: &str,
        text: &str,
        metadata: Option<&ContentMetadata>,
    ) -> TransportResult<()> {
        let body = TextRequest {
            to,
            text,
            content_metadata: metadata,
            e2ee: false,
        };
        self.post_unit("/messages/text", &body).await
    }

    async fn send_e2ee_text(
        &self,
        to: &str,
        text: &str,
        metadata: Option<&ContentMetadata>,
    ) -> TransportResult<()> {
        let body = TextRequest {
            to,
            text,
            content_metadata: metadata,
            e2ee: true,
        };
        self.post_unit("/messages/text", &body).await
    }

    async fn send_image(&self, to: &str, path: &str) -> TransportResult<()> {
        let body = ImageRequest {
            to,
            path,
            e2ee: false,
        };
        self.post_unit("/messages/image", &body).await
    }

    async fn send_e2ee_image(&self, to: &str, path: &str) -> TransportResult<()> {
        let body = ImageRequest {
            to,
            path,
            e2ee: true,
        };
        self.post_unit("/messages/image", &body).await
    }
}

/// Append percent-encoded path segments to the bridge base URL
fn segment_url(base_url: &str, segments: &[&str]) -> TransportResult<Url> {
    let mut url =
        Url::parse(base_url).map_err(|e| TransportError::Network(format!("{}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| TransportError::Network(format!("Cannot append to {}", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
