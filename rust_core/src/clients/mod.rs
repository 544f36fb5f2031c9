pub mod chat_relay;
pub mod terra;

use async_trait::async_trait;

use crate::models::{EchoPayload, GameSnapshot};
use terra::FetchError;

/// Source of game snapshots, keyed by game identifier.
#[async_trait]
pub trait GameStateFetcher: Send + Sync {
    async fn fetch_game(&self, game_name: &str) -> Result<GameSnapshot, FetchError>;
}

/// Outbound chat relay accepting `{"echo": ...}` payloads.
///
/// `target` is the fully formed POST URL (base url with the chat id appended).
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn post_echo(&self, target: &str, payload: &EchoPayload) -> anyhow::Result<()>;
}
