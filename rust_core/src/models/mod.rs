//! Game server data model
//!
//! Mirrors the subset of the view-game response the monitor reads. Decoding
//! is lenient: absent keys fall back to empty defaults and unknown action
//! types are kept as [`ActionType::Other`] so the mover scan can skip them.

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

// ============================================================================
// Snapshot
// ============================================================================

/// One parsed view-game response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GameSnapshot {
    /// Server-side errors (unknown game, bad request, ...). Non-empty means
    /// the rest of the payload is not usable.
    #[serde(rename = "error", default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: GameMetadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action_required: Vec<ActionItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub factions: HashMap<String, FactionInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GameMetadata {
    #[serde(default, deserialize_with = "flag")]
    pub aborted: bool,
    #[serde(default, deserialize_with = "flag")]
    pub finished: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FactionInfo {
    #[serde(default)]
    pub username: Option<String>,
}

/// A pending required action.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActionItem {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default)]
    pub faction: Option<String>,
    #[serde(default)]
    pub player: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// A full turn by the faction's player
    Full,
    /// A player still has to pick a faction
    Faction,
    /// Anything else the server reports (leech, cult, town, ...)
    #[serde(other)]
    Other,
}

impl GameSnapshot {
    pub fn aborted(&self) -> bool {
        self.metadata.aborted
    }

    pub fn finished(&self) -> bool {
        self.metadata.finished
    }

    /// Aborted and finished are treated identically by the monitor.
    pub fn is_over(&self) -> bool {
        self.aborted() || self.finished()
    }

    /// Username playing `faction`, if the faction is present and claimed.
    pub fn username_for(&self, faction: &str) -> Option<String> {
        self.factions
            .get(faction)
            .and_then(|info| info.username.clone())
    }

    /// Resolve who the game is currently waiting on.
    ///
    /// Starts from the player of the first action item's faction, then takes
    /// the first `full` or `faction` item in list order. List order decides
    /// between the two types; neither type outranks the other.
    pub fn resolve_mover(&self) -> Option<String> {
        let first = self.action_required.first()?;
        let mut player = first
            .faction
            .as_deref()
            .and_then(|faction| self.username_for(faction));

        for item in &self.action_required {
            match item.kind {
                ActionType::Full => {
                    player = item
                        .faction
                        .as_deref()
                        .and_then(|faction| self.username_for(faction));
                    debug!("waiting for {:?} to make full move", player);
                    break;
                }
                ActionType::Faction => {
                    player = item.player.clone();
                    debug!("waiting for {:?} to pick a faction", player);
                    break;
                }
                ActionType::Other => {}
            }
        }

        player
    }
}

// ============================================================================
// Chat relay payload
// ============================================================================

/// Body POSTed to the chat relay. `echo` carries an HTML-flavored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoPayload {
    pub echo: String,
}

impl EchoPayload {
    pub fn new(echo: impl Into<String>) -> Self {
        Self { echo: echo.into() }
    }
}

// ============================================================================
// Decoding helpers
// ============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Server flags arrive as integers (nonzero = set); accept booleans and
/// numeric strings too.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_f64().map_or(false, |v| v != 0.0),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            !s.is_empty() && s != "0"
        }
        _ => false,
    })
}
