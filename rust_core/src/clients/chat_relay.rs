use super::ChatSink;
use crate::models::EchoPayload;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use std::time::Duration;

/// HTTP client for the chat relay that turns echo payloads into chat messages.
#[derive(Debug, Clone)]
pub struct ChatRelayClient {
    http: Client,
}

impl ChatRelayClient {
    /// `accept_invalid_certs` disables TLS certificate verification for relay
    /// calls. Only meant for relays behind self-signed certificates.
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .context("Failed to build chat relay HTTP client")?;

        Ok(Self { http })
    }

    pub async fn send(&self, target: &str, payload: &EchoPayload) -> Result<()> {
        let resp = self
            .http
            .post(target)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Chat relay request failed: {target}"))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        info!("request: {}, {}, {}, {:?}", status, target, text, payload);
        if !status.is_success() {
            anyhow::bail!("Chat relay non-2xx: {status} body={text}");
        }
        Ok(())
    }
}

#[async_trait]
impl ChatSink for ChatRelayClient {
    async fn post_echo(&self, target: &str, payload: &EchoPayload) -> Result<()> {
        self.send(target, payload).await
    }
}
