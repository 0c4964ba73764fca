//! Detection of abandoned rounds
//!
//! When players drop out during a round the detector starts a one-shot
//! timer. When the timer fires the situation is checked again, and the
//! round is terminated only if nobody came back in the meantime. A timer
//! is tagged with the stage generation it was armed in, so a timer that
//! outlived its round does nothing.

use crate::entity::{PlayMode, Stage};
use crate::error::NodeResult;
use crate::game::GameState;
use crate::lifecycle;
use crate::node::NodeEvent;
use crate::statistics::Statistics;
use log::{debug, error, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkoverState {
    Idle,
    /// A check is scheduled for the given stage generation
    Watching { generation: u64 },
}

/// What a fired check did to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkoverOutcome {
    /// Round moved on or players came back
    Ignored,
    /// Standalone node went back to the lobby
    Reset,
    /// Round was stopped, peers must be told
    Stopped,
}

/// Checks if enough players are still around to keep the round going
///
/// A game with a single registered player needs that player, any other
/// game needs at least two. Only online players driving a robot count.
pub fn has_enough_online_players(game: &GameState) -> bool {
    let required = if game.players().len() > 1 { 2 } else { 1 };
    let active = game
        .players()
        .iter()
        .filter(|p| p.online && game.find_robot_with_owner_name(&p.name).is_some())
        .count();
    active >= required
}

#[derive(Debug)]
pub struct WalkoverDetector {
    state: WalkoverState,
    mode: PlayMode,
}

impl WalkoverDetector {
    pub fn new(mode: PlayMode) -> Self {
        Self {
            state: WalkoverState::Idle,
            mode,
        }
    }

    pub fn state(&self) -> WalkoverState {
        self.state
    }

    /// Starts watching if the round lacks players
    ///
    /// Returns the generation a check must be scheduled for, or `None` when
    /// nothing needs to be scheduled (enough players, no round running, or
    /// a check for this round is already pending).
    pub fn arm(&mut self, game: &GameState) -> Option<u64> {
        if game.stage() != Stage::Play || has_enough_online_players(game) {
            return None;
        }
        let generation = game.generation();
        if self.state == (WalkoverState::Watching { generation }) {
            return None;
        }
        debug!("Not enough players online, watching for walkover");
        self.state = WalkoverState::Watching { generation };
        Some(generation)
    }

    /// Runs a scheduled check
    pub fn fire(
        &mut self,
        game: &mut GameState,
        generation: u64,
        stats: &Statistics,
        now: u64,
    ) -> NodeResult<WalkoverOutcome> {
        if self.state == (WalkoverState::Watching { generation }) {
            self.state = WalkoverState::Idle;
        }

        if game.stage() != Stage::Play
            || game.generation() != generation
            || has_enough_online_players(game)
        {
            return Ok(WalkoverOutcome::Ignored);
        }

        match self.mode {
            PlayMode::Standalone => {
                warn!("Player left the test drive, back to the lobby");
                lifecycle::reset_game(game, stats);
                Ok(WalkoverOutcome::Reset)
            }
            PlayMode::Multiplayer => {
                warn!("Not enough players left, terminating the round by walkover");
                lifecycle::stop_game(game, now)?;
                Ok(WalkoverOutcome::Stopped)
            }
        }
    }
}

/// Schedules a walkover check to be delivered to the node event loop
pub fn spawn_timer(
    delay: Duration,
    generation: u64,
    events: mpsc::UnboundedSender<NodeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = events.send(NodeEvent::WalkoverCheck { generation }) {
            error!("Failed to deliver walkover check: {}", e);
        }
    })
}
