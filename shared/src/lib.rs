use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_LIFE: u32 = 10;
pub const DEFAULT_ABANDONED_GAME_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_SELF_REFILL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_DEPLETION_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_CHARGES: u32 = 5;
pub const DEFAULT_POWER_UP_TIMEOUT_MS: u64 = 3000;
pub const CARD_MANAGEMENT_DELAY_MS: u64 = 200;

/// Discriminant of a power-up card as it travels between peers.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardType {
    ChargeLife,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub name: String,
    pub address: Option<String>,
    pub port: u16,
    pub online: bool,
}

impl PlayerSummary {
    pub fn new(name: &str, address: Option<&str>, port: u16, online: bool) -> Self {
        Self {
            name: name.to_string(),
            address: address.map(str::to_string),
            port,
            online,
        }
    }
}

/// Robot record exchanged between robots and players.
///
/// `address` is `None` when the sender describes itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RobotSummary {
    pub id: String,
    pub address: Option<String>,
    pub owner: Option<String>,
    pub life: u32,
    pub color: Option<String>,
}

/// Progress report of a robot standing over a power-up card.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChargeEvent {
    pub card: String,
    pub card_type: CardType,
    pub charging: RobotSummary,
    pub remaining: u32,
    pub full: bool,
    pub depleted: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HitEvent {
    pub hit: RobotSummary,
    pub source: RobotSummary,
    pub fatal: bool,
}

/// Commands broadcast from one node to its peers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum PeerCommand {
    StartGame,
    StopGame,
    RestartGame,
    /// A robot introducing itself to its peers
    Robot(RobotSummary),
    Players(Vec<PlayerSummary>),
    PlayerDisconnected { name: String },
    PlayerReconnected { name: String },
    Charge(ChargeEvent),
    Hit(HitEvent),
}

impl PeerCommand {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerCommand::StartGame => "startgame",
            PeerCommand::StopGame => "stopgame",
            PeerCommand::RestartGame => "restartgame",
            PeerCommand::Robot(_) => "robot",
            PeerCommand::Players(_) => "players",
            PeerCommand::PlayerDisconnected { .. } => "playerdisconnected",
            PeerCommand::PlayerReconnected { .. } => "playerreconnected",
            PeerCommand::Charge(_) => "charging",
            PeerCommand::Hit(_) => "hit",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
