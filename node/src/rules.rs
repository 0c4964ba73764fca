//! Game rules evaluated against the registry

use crate::entity::{Robot, Stage};
use crate::game::GameState;
use log::{debug, info};

/// Checks if a robot may drive. `None` stands for a robot not known yet.
pub fn can_move(game: &GameState, robot: Option<&Robot>) -> bool {
    game.stage() == Stage::Play && robot.map_or(true, Robot::is_alive)
}

/// Checks if a robot may fire its IR beam. Same rule as [`can_move`].
pub fn can_fire(game: &GameState, robot: Option<&Robot>) -> bool {
    game.stage() == Stage::Play && robot.map_or(true, Robot::is_alive)
}

/// Applies a confirmed hit of `shooter` on `hit`
///
/// A robot already out of life absorbs further hits without effect.
/// Otherwise it loses one life unit, and the shooter scores a kill when
/// that was the last one. Returns true when the hit was fatal.
pub fn evaluate_hit(game: &mut GameState, hit: &str, shooter: &str) -> bool {
    let fatal = match game.find_robot_with_identifier_mut(hit) {
        Some(robot) if robot.is_alive() => {
            robot.decrease_life(1);
            !robot.is_alive()
        }
        Some(_) => {
            debug!("Ignoring hit on robot {}, already out of life", hit);
            return false;
        }
        None => {
            debug!("Ignoring hit on unknown robot {}", hit);
            return false;
        }
    };

    if fatal {
        if let Some(robot) = game.find_robot_with_identifier_mut(shooter) {
            robot.increase_kills();
        }
        info!("Robot {} was knocked out by {}", hit, shooter);
    }
    fatal
}

/// Checks if the current round has a winner
///
/// With several robots the round is over once at most one of them is still
/// alive; a robot playing alone is done when it runs out of life.
pub fn is_game_over(game: &GameState) -> bool {
    if game.stage() != Stage::Play || game.robots().is_empty() {
        return false;
    }
    let alive = game.robots().iter().filter(|r| r.is_alive()).count();
    if game.robots().len() == 1 {
        alive == 0
    } else {
        alive <= 1
    }
}
