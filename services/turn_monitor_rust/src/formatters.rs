use chrono::Duration;

/// Placeholder for a mover the server did not name.
const UNKNOWN_PLAYER: &str = "?";

/// Message announcing the next mover.
///
/// The elapsed-time clause is only added when there is a previous player
/// and a measured duration for their turn.
pub fn format_to_move(
    game_name: &str,
    player: Option<&str>,
    previous_player: Option<&str>,
    move_time: Option<Duration>,
) -> String {
    let player = player.unwrap_or(UNKNOWN_PLAYER);
    match (previous_player, move_time) {
        (Some(previous), Some(elapsed)) => format!(
            "game: <b>{game_name}</b><br/><b>{previous}</b> took {:.2} mins to move<br/>next turn: <b>{player}</b>",
            minutes(elapsed)
        ),
        _ => format!("game: <b>{game_name}</b><br/>next turn: <b>{player}</b>"),
    }
}

/// Message announcing that the game is over (finished or aborted).
pub fn format_game_over(game_name: &str) -> String {
    format!("game, <b>{game_name}</b>, finished")
}

fn minutes(elapsed: Duration) -> f64 {
    elapsed.num_milliseconds() as f64 / 1000.0 / 60.0
}
