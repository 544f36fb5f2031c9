//! Shared model and HTTP clients for the turn monitor.
//!
//! `models` holds the game server's view-game payload and the chat relay
//! echo payload. `clients` holds the two outbound HTTP integrations and the
//! traits the monitor service programs against.

pub mod clients;
pub mod models;

pub use clients::chat_relay::ChatRelayClient;
pub use clients::terra::{FetchError, TerraClient, DEFAULT_GAME_URL};
pub use clients::{ChatSink, GameStateFetcher};
pub use reqwest::StatusCode;
pub use models::{ActionItem, ActionType, EchoPayload, FactionInfo, GameMetadata, GameSnapshot};
