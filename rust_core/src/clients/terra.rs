use super::GameStateFetcher;
use crate::models::GameSnapshot;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GAME_URL: &str = "https://terra.snellman.net/app/view-game/";

/// Failure to obtain a usable snapshot from the game server.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("game server request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("game server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unparsable game response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the view-game endpoint.
#[derive(Debug, Clone)]
pub struct TerraClient {
    client: Client,
    game_url: String,
}

impl TerraClient {
    pub fn new(game_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build game server HTTP client")?;

        Ok(Self {
            client,
            game_url: game_url.into(),
        })
    }

    pub fn game_url(&self) -> &str {
        &self.game_url
    }

    /// GET `<game_url>?game=<game_name>` and decode the body.
    pub async fn get_game(&self, game_name: &str) -> Result<GameSnapshot, FetchError> {
        let resp = self
            .client
            .get(&self.game_url)
            .query(&[("game", game_name)])
            .send()
            .await?;
        info!("monitoring game: {} at {}", game_name, resp.url());

        let status = resp.status();
        let body = resp.text().await?;
        debug!("game response: {}", body);

        parse_snapshot(status, &body)
    }
}

#[async_trait]
impl GameStateFetcher for TerraClient {
    async fn fetch_game(&self, game_name: &str) -> Result<GameSnapshot, FetchError> {
        self.get_game(game_name).await
    }
}

/// Decode a view-game body. The server reports most problems inside the
/// JSON `error` list, so the status code only matters when the body does
/// not decode.
pub fn parse_snapshot(status: StatusCode, body: &str) -> Result<GameSnapshot, FetchError> {
    match serde_json::from_str::<GameSnapshot>(body) {
        Ok(snapshot) => Ok(snapshot),
        Err(_) if !status.is_success() => Err(FetchError::Status {
            status,
            body: truncate(body, 200),
        }),
        Err(e) => Err(FetchError::Decode(e)),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
