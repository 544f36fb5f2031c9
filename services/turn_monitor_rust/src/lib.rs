//! turn_monitor_rust - watches one game on the game server and posts a chat
//! message whenever the player to move changes or the game ends.

pub mod config;
pub mod error;
pub mod formatters;
pub mod monitor;
pub mod notifier;

pub use config::{MonitorConfig, ServiceConfig};
pub use error::{ConfigError, CycleError};
pub use monitor::{evaluate, CycleOutcome, Decision, Evaluation, Monitor, MonitorState, NotificationKind};
pub use notifier::Notifier;
