//! Tunables of a node, all with the defaults used on the physical arena.

use crate::entity::PlayMode;
use shared::{
    CARD_MANAGEMENT_DELAY_MS, DEFAULT_ABANDONED_GAME_TIMEOUT_MS, DEFAULT_DEPLETION_INTERVAL_MS,
    DEFAULT_MAX_CHARGES, DEFAULT_MAX_LIFE, DEFAULT_POWER_UP_TIMEOUT_MS,
    DEFAULT_SELF_REFILL_INTERVAL_MS,
};
use std::time::Duration;

/// Power-up card tunables. Immutable once handed to the card economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardConfig {
    /// Minimum time between self refills of a card nobody is standing on
    pub self_refill_interval_ms: u64,
    /// Minimum time between charge units moving from a card into a robot
    pub depletion_interval_ms: u64,
    /// Capacity of a recharger card in charge units
    pub max_charges: u32,
    /// Gap after which successive authentications start a new recharge
    pub power_up_timeout_ms: u64,
    /// Period of the card management tick
    pub management_delay_ms: u64,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            self_refill_interval_ms: DEFAULT_SELF_REFILL_INTERVAL_MS,
            depletion_interval_ms: DEFAULT_DEPLETION_INTERVAL_MS,
            max_charges: DEFAULT_MAX_CHARGES,
            power_up_timeout_ms: DEFAULT_POWER_UP_TIMEOUT_MS,
            management_delay_ms: CARD_MANAGEMENT_DELAY_MS,
        }
    }
}

impl CardConfig {
    pub fn management_delay(&self) -> Duration {
        Duration::from_millis(self.management_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub abandoned_game_timeout_ms: u64,
    pub max_life: u32,
    pub play_mode: PlayMode,
    pub card: CardConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            abandoned_game_timeout_ms: DEFAULT_ABANDONED_GAME_TIMEOUT_MS,
            max_life: DEFAULT_MAX_LIFE,
            play_mode: PlayMode::Multiplayer,
            card: CardConfig::default(),
        }
    }
}
