//! Stage transitions of a game
//!
//! Every node runs these transitions on its own copy of the registry when
//! it receives the matching peer command. Telling the other nodes about a
//! transition is up to the caller.
//!
//! ```text
//! INIT --start_game/start_test_drive--> PLAY --stop_game--> SUMMARY
//!   ^                                                          |
//!   +-------------------- restart_game / reset_game -----------+
//! ```

use crate::entity::{PlayMode, Stage};
use crate::error::{NodeError, NodeResult};
use crate::game::GameState;
use crate::statistics::Statistics;
use log::{info, warn};

fn require_stage(game: &GameState, expected: Stage, action: &'static str) -> NodeResult<()> {
    if game.stage() != expected {
        return Err(NodeError::InvalidTransition {
            from: game.stage(),
            action,
        });
    }
    Ok(())
}

/// Back to the lobby with every robot free
pub fn reset_game(game: &mut GameState, stats: &Statistics) {
    for robot in game.robots_mut() {
        robot.owner = None;
    }
    for player in game.players_mut() {
        player.dismissed_summary = false;
    }
    restart_game(game, stats);
}

/// Single player round on this node's robot
pub fn start_test_drive(game: &mut GameState, driver: &str) -> NodeResult<()> {
    require_stage(game, Stage::Init, "start a test drive")?;
    let identifier = game
        .find_local_robot()
        .map(|r| r.identifier.clone())
        .ok_or(NodeError::NoLocalRobot)?;
    game.assign_owner(&identifier, Some(driver))?;

    let max_life = game.max_life;
    if let Some(robot) = game.find_local_robot_mut() {
        robot.short_id = 1;
        robot.life = max_life;
        robot.kills = 0;
    }
    if let Some(player) = game.find_player_with_name_mut(driver) {
        player.dismissed_summary = false;
    }
    game.set_stage(Stage::Play);
    info!("Test drive started by '{}'", driver);
    Ok(())
}

/// Starts a round with every known robot
///
/// Short ids are given in ascending identifier order, so every node that
/// knows the same robots hands out the same ids.
pub fn start_game(game: &mut GameState, now: u64) -> NodeResult<()> {
    require_stage(game, Stage::Init, "start a game")?;

    let ordered: Vec<String> = game
        .ordered_robots()
        .iter()
        .map(|r| r.identifier.clone())
        .collect();
    let max_life = game.max_life;
    for (index, identifier) in ordered.iter().enumerate() {
        let Some(robot) = game.find_robot_with_identifier_mut(identifier) else {
            continue;
        };
        // Short ids travel in the IR beam as one byte, 0 means none
        robot.short_id = match u8::try_from(index + 1) {
            Ok(short_id) => short_id,
            Err(_) => {
                warn!("No short id left for robot {}", robot);
                0
            }
        };
        robot.life = max_life;
        robot.kills = 0;
    }
    for player in game.players_mut() {
        player.dismissed_summary = false;
    }
    for card in game.cards_mut() {
        card.reset();
    }
    game.game_start = Some(now);
    game.set_stage(Stage::Play);
    info!("Game started with {} robots", ordered.len());
    Ok(())
}

/// Back to the lobby keeping the owners that are still around
pub fn restart_game(game: &mut GameState, stats: &Statistics) {
    let online: Vec<String> = game
        .players()
        .iter()
        .filter(|p| p.online)
        .map(|p| p.name.clone())
        .collect();
    for robot in game.robots_mut() {
        robot.ready = false;
        let owner_online = robot
            .owner
            .as_deref()
            .map_or(false, |owner| online.iter().any(|n| n.eq_ignore_ascii_case(owner)));
        if !owner_online {
            robot.owner = None;
        }
    }
    for player in game.players_mut() {
        player.resources_loaded = false;
    }
    game.set_stage(Stage::Init);
    stats.clear_all();
}

/// Ends the current round and moves on to the summary screen
pub fn stop_game(game: &mut GameState, now: u64) -> NodeResult<()> {
    require_stage(game, Stage::Play, "stop a game")?;
    game.game_stop = Some(now);
    game.set_stage(Stage::Summary);
    info!("Game stopped");
    Ok(())
}

/// Handles a stop request: a standalone node has no summary screen and
/// goes straight back to the lobby.
pub fn apply_stop_command(
    game: &mut GameState,
    mode: PlayMode,
    stats: &Statistics,
    now: u64,
) -> NodeResult<()> {
    match mode {
        PlayMode::Standalone => {
            reset_game(game, stats);
            Ok(())
        }
        PlayMode::Multiplayer => stop_game(game, now),
    }
}
