use chrono::Duration;
use log::{error, info};
use std::sync::Arc;
use terra_rust_core::{ChatSink, EchoPayload};

use crate::formatters;

/// Formats monitor events and hands them to the chat relay.
///
/// Dispatch is fire-and-forget: failures are logged, never retried or
/// returned.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn ChatSink>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(sink: Arc<dyn ChatSink>) -> Self {
        Self { sink }
    }

    pub async fn to_move(
        &self,
        target: &str,
        game_name: &str,
        player: Option<&str>,
        previous_player: Option<&str>,
        move_time: Option<Duration>,
    ) {
        let message = formatters::format_to_move(game_name, player, previous_player, move_time);
        self.dispatch(target, message).await
    }

    pub async fn game_over(&self, target: &str, game_name: &str) {
        let message = formatters::format_game_over(game_name);
        self.dispatch(target, message).await
    }

    async fn dispatch(&self, target: &str, message: String) {
        let payload = EchoPayload::new(message);
        match self.sink.post_echo(target, &payload).await {
            Ok(()) => info!("Sent notification to {}", target),
            Err(e) => error!("Failed to send notification to {}: {:#}", target, e),
        }
    }
}
