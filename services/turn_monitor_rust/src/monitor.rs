//! Monitor loop
//!
//! Each cycle reads the live config, fetches the game, evaluates the new
//! snapshot against [`MonitorState`] and dispatches at most one notification.
//! [`evaluate`] is pure: it takes the current state and returns the next one,
//! so [`Monitor::run_cycle`] only commits state after a successful evaluation.

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use terra_rust_core::{GameSnapshot, GameStateFetcher};

use crate::config::MonitorConfig;
use crate::error::CycleError;
use crate::notifier::Notifier;

// ============================================================================
// State
// ============================================================================

/// What the monitor remembers between cycles. Lives for the process only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub current_game: Option<String>,
    pub current_player: Option<String>,
    pub last_move_at: Option<DateTime<Utc>>,
    pub game_over_notified: bool,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `game_name`, clearing everything remembered about the
    /// previous game. Returns true when a switch happened.
    pub fn observe_game(&mut self, game_name: &str) -> bool {
        if self.current_game.as_deref() == Some(game_name) {
            return false;
        }
        *self = MonitorState {
            current_game: Some(game_name.to_string()),
            ..MonitorState::default()
        };
        true
    }
}

// ============================================================================
// Evaluation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Game just observed as over; send the game-over message.
    GameOver,
    /// Game over was already announced.
    GameOverAlreadyNotified,
    /// Same mover as last cycle.
    StillWaiting { player: Option<String> },
    /// Mover changed; `move_time` is how long the previous mover took,
    /// absent on the first observation after a reset.
    MoverChanged {
        player: Option<String>,
        previous_player: Option<String>,
        move_time: Option<Duration>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub next: MonitorState,
    pub decision: Decision,
}

/// Decide what a snapshot means given the remembered state.
pub fn evaluate(
    state: &MonitorState,
    snapshot: &GameSnapshot,
    now: DateTime<Utc>,
) -> Result<Evaluation, CycleError> {
    if !snapshot.errors.is_empty() {
        return Err(CycleError::from_server_errors(&snapshot.errors));
    }

    if snapshot.is_over() {
        if snapshot.aborted() {
            info!("game aborted");
        } else {
            info!("game finished");
        }

        let decision = if state.game_over_notified {
            Decision::GameOverAlreadyNotified
        } else {
            Decision::GameOver
        };
        let next = MonitorState {
            game_over_notified: true,
            ..state.clone()
        };
        return Ok(Evaluation { next, decision });
    }

    info!("action_required: {:?}", snapshot.action_required);
    if snapshot.action_required.is_empty() {
        return Err(CycleError::Consistency);
    }

    let player = snapshot.resolve_mover();
    if player == state.current_player {
        return Ok(Evaluation {
            next: state.clone(),
            decision: Decision::StillWaiting { player },
        });
    }

    let move_time = state.last_move_at.map(|last| now - last);
    let next = MonitorState {
        current_player: player.clone(),
        last_move_at: Some(now),
        ..state.clone()
    };

    Ok(Evaluation {
        next,
        decision: Decision::MoverChanged {
            player,
            previous_player: state.current_player.clone(),
            move_time,
        },
    })
}

// ============================================================================
// Cycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ToMove,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A notification was dispatched (delivery itself is fire-and-forget).
    Notified(NotificationKind),
    StillWaiting,
    GameOverAlreadyNotified,
}

pub struct Monitor {
    config_path: PathBuf,
    fetcher: Arc<dyn GameStateFetcher>,
    notifier: Notifier,
    state: MonitorState,
}

impl Monitor {
    pub fn new(config_path: PathBuf, fetcher: Arc<dyn GameStateFetcher>, notifier: Notifier) -> Self {
        Self {
            config_path,
            fetcher,
            notifier,
            state: MonitorState::new(),
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Run one config → fetch → evaluate → notify pass.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome, CycleError> {
        let cfg = MonitorConfig::load(&self.config_path)?;
        info!("monitor config: {:?}", cfg);

        if self.state.observe_game(&cfg.game_name) {
            info!("monitoring new game: {}", cfg.game_name);
        }

        let snapshot = self.fetcher.fetch_game(&cfg.game_name).await?;
        let Evaluation { next, decision } = evaluate(&self.state, &snapshot, now)?;
        self.state = next;

        let target = cfg.notify_target();
        let outcome = match decision {
            Decision::GameOver => {
                self.notifier.game_over(&target, &cfg.game_name).await;
                CycleOutcome::Notified(NotificationKind::GameOver)
            }
            Decision::GameOverAlreadyNotified => CycleOutcome::GameOverAlreadyNotified,
            Decision::StillWaiting { player } => {
                info!("still waiting for player {:?} to move", player);
                CycleOutcome::StillWaiting
            }
            Decision::MoverChanged {
                player,
                previous_player,
                move_time,
            } => {
                info!("player {:?} is new mover", player);
                self.notifier
                    .to_move(
                        &target,
                        &cfg.game_name,
                        player.as_deref(),
                        previous_player.as_deref(),
                        move_time,
                    )
                    .await;
                CycleOutcome::Notified(NotificationKind::ToMove)
            }
        };

        Ok(outcome)
    }

    /// Sleep, run a cycle, repeat, until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, poll_interval: std::time::Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            info!("sleeping for {} secs", poll_interval.as_secs());
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    return;
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }

            match self.run_cycle(Utc::now()).await {
                Ok(outcome) => debug!("cycle outcome: {:?}", outcome),
                Err(e) => error!("{}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::Mutex;
    use terra_rust_core::{ChatSink, EchoPayload, FetchError, StatusCode};

    fn snapshot(value: serde_json::Value) -> GameSnapshot {
        serde_json::from_value(value).unwrap()
    }

    fn waiting_on(username: &str) -> GameSnapshot {
        snapshot(json!({
            "error": [],
            "metadata": { "aborted": 0, "finished": 0 },
            "action_required": [{ "type": "full", "faction": "A" }],
            "factions": { "A": { "username": username } }
        }))
    }

    fn finished() -> GameSnapshot {
        snapshot(json!({ "metadata": { "aborted": 0, "finished": 1 } }))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_observe_game_resets_state() {
        let mut state = MonitorState {
            current_game: Some("old".into()),
            current_player: Some("Alice".into()),
            last_move_at: Some(at(0)),
            game_over_notified: true,
        };
        assert!(state.observe_game("new"));
        assert_eq!(
            state,
            MonitorState {
                current_game: Some("new".into()),
                ..MonitorState::default()
            }
        );
        assert!(!state.observe_game("new"));
    }

    #[test]
    fn test_first_mover_has_no_move_time() {
        let state = MonitorState::new();
        let eval = evaluate(&state, &waiting_on("Alice"), at(10)).unwrap();
        assert_eq!(
            eval.decision,
            Decision::MoverChanged {
                player: Some("Alice".into()),
                previous_player: None,
                move_time: None,
            }
        );
        assert_eq!(eval.next.current_player.as_deref(), Some("Alice"));
        assert_eq!(eval.next.last_move_at, Some(at(10)));
    }

    #[test]
    fn test_mover_change_measures_previous_turn() {
        let state = MonitorState {
            current_game: Some("g".into()),
            current_player: Some("Alice".into()),
            last_move_at: Some(at(0)),
            game_over_notified: false,
        };
        let eval = evaluate(&state, &waiting_on("Bob"), at(125)).unwrap();
        assert_eq!(
            eval.decision,
            Decision::MoverChanged {
                player: Some("Bob".into()),
                previous_player: Some("Alice".into()),
                move_time: Some(Duration::seconds(125)),
            }
        );
        assert_eq!(eval.next.last_move_at, Some(at(125)));
    }

    #[test]
    fn test_unchanged_mover_leaves_state_alone() {
        let state = MonitorState {
            current_game: Some("g".into()),
            current_player: Some("Alice".into()),
            last_move_at: Some(at(0)),
            game_over_notified: false,
        };
        for t in [5, 10, 500] {
            let eval = evaluate(&state, &waiting_on("Alice"), at(t)).unwrap();
            assert_eq!(eval.next, state);
            assert!(matches!(eval.decision, Decision::StillWaiting { .. }));
        }
    }

    #[test]
    fn test_unresolved_mover_after_reset_is_not_a_change() {
        let state = MonitorState {
            current_game: Some("g".into()),
            ..MonitorState::default()
        };
        let snap = snapshot(json!({
            "action_required": [{ "type": "full", "faction": "giants" }],
            "factions": {}
        }));
        let eval = evaluate(&state, &snap, at(0)).unwrap();
        assert_eq!(eval.decision, Decision::StillWaiting { player: None });
        assert_eq!(eval.next.last_move_at, None);
    }

    #[test]
    fn test_game_over_once() {
        let state = MonitorState::new();
        let first = evaluate(&state, &finished(), at(0)).unwrap();
        assert_eq!(first.decision, Decision::GameOver);
        assert!(first.next.game_over_notified);

        let second = evaluate(&first.next, &finished(), at(5)).unwrap();
        assert_eq!(second.decision, Decision::GameOverAlreadyNotified);
        assert_eq!(second.next, first.next);
    }

    #[test]
    fn test_aborted_counts_as_over() {
        let snap = snapshot(json!({
            "metadata": { "aborted": 1, "finished": 0 },
            "action_required": [{ "type": "full", "faction": "A" }],
            "factions": { "A": { "username": "Alice" } }
        }));
        let eval = evaluate(&MonitorState::new(), &snap, at(0)).unwrap();
        assert_eq!(eval.decision, Decision::GameOver);
        assert_eq!(eval.next.current_player, None);
    }

    #[test]
    fn test_server_errors_skip_cycle() {
        let snap = snapshot(json!({ "error": ["Unknown game: g"] }));
        let err = evaluate(&MonitorState::new(), &snap, at(0)).unwrap_err();
        assert!(matches!(err, CycleError::Game { ref first, .. } if first == "Unknown game: g"));
    }

    #[test]
    fn test_no_actions_is_inconsistent() {
        let snap = snapshot(json!({ "metadata": { "aborted": 0, "finished": 0 } }));
        let err = evaluate(&MonitorState::new(), &snap, at(0)).unwrap_err();
        assert!(matches!(err, CycleError::Consistency));
    }

    // ------------------------------------------------------------------------
    // Cycle tests with in-memory collaborators
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<GameSnapshot, FetchError>>>,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn push(&self, response: Result<GameSnapshot, FetchError>) {
            self.responses.lock().unwrap().push_back(response);
        }
    }

    #[async_trait]
    impl GameStateFetcher for ScriptedFetcher {
        async fn fetch_game(&self, game_name: &str) -> Result<GameSnapshot, FetchError> {
            self.requested.lock().unwrap().push(game_name.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(GameSnapshot::default()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        posts: Mutex<Vec<(String, EchoPayload)>>,
    }

    #[async_trait]
    impl ChatSink for RecordingSink {
        async fn post_echo(&self, target: &str, payload: &EchoPayload) -> anyhow::Result<()> {
            self.posts
                .lock()
                .unwrap()
                .push((target.to_string(), payload.clone()));
            Ok(())
        }
    }

    fn config_file(game_name: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url": "https://relay/send/", "chatid": "42", "game_name": "{game_name}"}}"#
        )
        .unwrap();
        file
    }

    fn monitor_for(path: PathBuf) -> (Monitor, Arc<ScriptedFetcher>, Arc<RecordingSink>) {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let sink = Arc::new(RecordingSink::default());
        let monitor = Monitor::new(path, fetcher.clone(), Notifier::new(sink.clone()));
        (monitor, fetcher, sink)
    }

    #[tokio::test]
    async fn test_cycle_notifies_first_mover() {
        let cfg = config_file("g1");
        let (mut monitor, fetcher, sink) = monitor_for(cfg.path().to_path_buf());
        fetcher.push(Ok(waiting_on("Alice")));

        let outcome = monitor.run_cycle(at(0)).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Notified(NotificationKind::ToMove));
        assert_eq!(fetcher.requested.lock().unwrap().as_slice(), ["g1"]);

        let posts = sink.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "https://relay/send/42");
        assert_eq!(posts[0].1.echo, "game: <b>g1</b><br/>next turn: <b>Alice</b>");
    }

    #[tokio::test]
    async fn test_cycle_fetch_error_keeps_state() {
        let cfg = config_file("g1");
        let (mut monitor, fetcher, sink) = monitor_for(cfg.path().to_path_buf());
        fetcher.push(Ok(waiting_on("Alice")));
        monitor.run_cycle(at(0)).await.unwrap();
        let before = monitor.state().clone();

        fetcher.push(Err(FetchError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "bad gateway".into(),
        }));
        let err = monitor.run_cycle(at(5)).await.unwrap_err();
        assert!(matches!(err, CycleError::Fetch(_)));
        assert_eq!(monitor.state(), &before);
        assert_eq!(sink.posts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_config_error_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut monitor, fetcher, sink) = monitor_for(dir.path().join("missing.json"));

        let err = monitor.run_cycle(at(0)).await.unwrap_err();
        assert!(matches!(err, CycleError::Config(_)));
        assert!(fetcher.requested.lock().unwrap().is_empty());
        assert!(sink.posts.lock().unwrap().is_empty());
        assert_eq!(monitor.state(), &MonitorState::new());
    }

    struct DownRelay;

    #[async_trait]
    impl ChatSink for DownRelay {
        async fn post_echo(&self, _target: &str, _payload: &EchoPayload) -> anyhow::Result<()> {
            anyhow::bail!("relay down")
        }
    }

    #[tokio::test]
    async fn test_cycle_relay_failure_still_marks_game_over() {
        let cfg = config_file("g1");
        let fetcher = Arc::new(ScriptedFetcher::default());
        let mut monitor = Monitor::new(
            cfg.path().to_path_buf(),
            fetcher.clone(),
            Notifier::new(Arc::new(DownRelay)),
        );
        fetcher.push(Ok(finished()));
        fetcher.push(Ok(finished()));

        let first = monitor.run_cycle(at(0)).await.unwrap();
        assert_eq!(first, CycleOutcome::Notified(NotificationKind::GameOver));
        assert!(monitor.state().game_over_notified);

        let second = monitor.run_cycle(at(5)).await.unwrap();
        assert_eq!(second, CycleOutcome::GameOverAlreadyNotified);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let cfg = config_file("g1");
        let (mut monitor, fetcher, _sink) = monitor_for(cfg.path().to_path_buf());
        for _ in 0..10 {
            fetcher.push(Ok(waiting_on("Alice")));
        }

        monitor
            .run_until(
                std::time::Duration::from_millis(10),
                tokio::time::sleep(std::time::Duration::from_millis(55)),
            )
            .await;

        let polls = fetcher.requested.lock().unwrap().len();
        assert!(polls >= 1, "expected at least one poll, got {polls}");
        assert_eq!(monitor.state().current_player.as_deref(), Some("Alice"));
    }
}
