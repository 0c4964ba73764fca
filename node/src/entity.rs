//! Passive records held by the game registry
//!
//! Players are people connected through a browser, robots are the physical
//! units taking part in the arena (this node's own robot has no address).

use serde::{Deserialize, Serialize};
use shared::{PlayerSummary, RobotSummary};
use std::fmt;
use std::net::IpAddr;

/// Game lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Lobby, players pick robots
    Init,
    /// Round in progress
    Play,
    /// Post-round ranking screen
    Summary,
}

/// How this node was launched: a full arena or a single-robot test drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Multiplayer,
    Standalone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlMode {
    /// Move robot through buttons on screen
    #[default]
    Buttons,
    /// Move robot tilting the device
    Tilt,
}

impl ControlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMode::Buttons => "buttons",
            ControlMode::Tilt => "tilt",
        }
    }

    /// Unknown or missing modes fall back to buttons.
    pub fn parse(mode: Option<&str>) -> Self {
        match mode {
            Some(m) if m.eq_ignore_ascii_case("tilt") => ControlMode::Tilt,
            _ => ControlMode::Buttons,
        }
    }
}

/// Colors the robot LED can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedColor {
    Off,
    Green,
    Red,
    Blue,
    Magenta,
    Cyan,
    Yellow,
    White,
    Orange,
    Pink,
    Gray,
    DarkGreen,
    DarkRed,
    DarkBlue,
}

impl LedColor {
    pub const ALL: [LedColor; 14] = [
        LedColor::Off,
        LedColor::Green,
        LedColor::Red,
        LedColor::Blue,
        LedColor::Magenta,
        LedColor::Cyan,
        LedColor::Yellow,
        LedColor::White,
        LedColor::Orange,
        LedColor::Pink,
        LedColor::Gray,
        LedColor::DarkGreen,
        LedColor::DarkRed,
        LedColor::DarkBlue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LedColor::Off => "OFF",
            LedColor::Green => "GREEN",
            LedColor::Red => "RED",
            LedColor::Blue => "BLUE",
            LedColor::Magenta => "MAGENTA",
            LedColor::Cyan => "CYAN",
            LedColor::Yellow => "YELLOW",
            LedColor::White => "WHITE",
            LedColor::Orange => "ORANGE",
            LedColor::Pink => "PINK",
            LedColor::Gray => "GRAY",
            LedColor::DarkGreen => "DARK_GREEN",
            LedColor::DarkRed => "DARK_RED",
            LedColor::DarkBlue => "DARK_BLUE",
        }
    }

    /// Web color used by the browser views
    pub fn hex(&self) -> &'static str {
        match self {
            LedColor::Off => "",
            LedColor::Green => "#00FF00",
            LedColor::Red => "#FF0000",
            LedColor::Blue => "#0000FF",
            LedColor::Magenta => "#FF00FF",
            LedColor::Cyan => "#00FFFF",
            LedColor::Yellow => "#FFFF00",
            LedColor::White => "#FFFFFF",
            LedColor::Orange => "#FF8C00",
            LedColor::Pink => "#FF008C",
            LedColor::Gray => "#8C8C8C",
            LedColor::DarkGreen => "#008C00",
            LedColor::DarkRed => "#8C0000",
            LedColor::DarkBlue => "#00008C",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

/// Someone playing the game, possibly connected to another robot
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub address: Option<IpAddr>,
    /// Websocket port, 0 when unknown
    pub port: u16,
    /// HTTP session token
    pub session: Option<String>,
    pub online: bool,
    pub dismissed_summary: bool,
    pub resources_loaded: bool,
    /// Last measured round trip, in milliseconds
    pub ping_ms: u64,
}

impl Player {
    pub fn new(name: &str, address: Option<IpAddr>, port: u16) -> Self {
        Self {
            name: name.to_string(),
            address,
            port,
            session: None,
            online: false,
            dismissed_summary: false,
            resources_loaded: false,
            ping_ms: 0,
        }
    }

    /// Builds a player out of a record received from another robot.
    ///
    /// An address that does not parse is dropped, the player is kept.
    pub fn from_summary(summary: &PlayerSummary) -> Self {
        let address = summary
            .address
            .as_deref()
            .and_then(|a| a.parse::<IpAddr>().ok());
        let mut player = Player::new(&summary.name, address, summary.port);
        player.online = summary.online;
        player
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            name: self.name.clone(),
            address: self.address.map(|a| a.to_string()),
            port: self.port,
            online: self.online,
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A robot taking part in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    /// None for the robot this node runs on
    pub address: Option<IpAddr>,
    /// Stable identifier, unique in a game
    pub identifier: String,
    /// Per-round ordinal tagging outgoing beams. 0 until a round starts.
    pub short_id: u8,
    /// Name of the owning player
    pub owner: Option<String>,
    pub previous_owner: Option<String>,
    /// Owner pressed 'start' in the lobby
    pub ready: bool,
    pub life: u32,
    pub kills: u32,
    pub color: Option<LedColor>,
    pub control_mode: ControlMode,
}

impl Robot {
    fn with_address(identifier: &str, address: Option<IpAddr>) -> Self {
        Self {
            address,
            identifier: identifier.to_string(),
            short_id: 0,
            owner: None,
            previous_owner: None,
            ready: false,
            life: 0,
            kills: 0,
            color: None,
            control_mode: ControlMode::Buttons,
        }
    }

    pub fn new_local(identifier: &str) -> Self {
        Self::with_address(identifier, None)
    }

    pub fn new_remote(identifier: &str, address: IpAddr) -> Self {
        Self::with_address(identifier, Some(address))
    }

    pub fn is_local(&self) -> bool {
        self.address.is_none()
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0
    }

    pub fn is_owned_by(&self, name: &str) -> bool {
        self.owner
            .as_deref()
            .map_or(false, |owner| owner.eq_ignore_ascii_case(name))
    }

    pub fn decrease_life(&mut self, amount: u32) {
        self.life = self.life.saturating_sub(amount);
    }

    pub fn increase_kills(&mut self) {
        self.kills += 1;
    }

    pub fn summary(&self) -> RobotSummary {
        RobotSummary {
            id: self.identifier.clone(),
            address: self.address.map(|a| a.to_string()),
            owner: self.owner.clone(),
            life: self.life,
            color: self.color.map(|c| c.name().to_string()),
        }
    }
}

impl fmt::Display for Robot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(addr) => write!(f, "{}@{}", self.identifier, addr),
            None => write!(f, "{}@localhost", self.identifier),
        }
    }
}
