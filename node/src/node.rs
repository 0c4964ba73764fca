//! Event loop coordinating the engine of a robot node
//!
//! The [`Node`] owns the card economy and the walkover detector, and applies
//! every command to the shared registry. Other tasks and threads talk to it
//! through a cloneable [`NodeHandle`]:
//! - Web handlers post lifecycle requests and player status changes
//! - The RFID reader thread posts card authentications via [`RfidBridge`]
//! - The peer receiver posts commands broadcast by other robots
//!
//! Commands issued on this node are applied locally first and then
//! broadcast; commands received from peers are only applied.

use crate::card::CardRegistry;
use crate::config::NodeConfig;
use crate::entity::{LedColor, Robot, Stage};
use crate::error::{NodeError, NodeResult, StorageError};
use crate::game::GameState;
use crate::lifecycle;
use crate::network::Outbound;
use crate::power_ups::PowerUps;
use crate::rules;
use crate::statistics::Statistics;
use crate::storage::{self, LocalStorage};
use crate::utils::get_timestamp;
use crate::walkover::{self, WalkoverDetector, WalkoverOutcome};
use log::{debug, error, info, warn};
use shared::{HitEvent, PeerCommand, RobotSummary};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Where a command comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Issued on this node, must be broadcast once applied
    Local,
    /// Received from another robot
    Peer(IpAddr),
}

/// Messages sent to the node loop
#[derive(Debug)]
pub enum NodeEvent {
    Command {
        command: PeerCommand,
        origin: Origin,
    },
    CardAuthenticated {
        uid: Vec<u8>,
        sector: Vec<u8>,
    },
    StartTestDrive {
        driver: String,
    },
    ResetGame,
    WalkoverCheck {
        generation: u64,
    },
    Shutdown,
}

/// Callbacks of the RFID reader sitting under the robot
pub trait RfidCallback: Send + Sync {
    /// A card entered the antenna field
    fn on_card_detected(&self);

    fn on_uid(&self, uid: &[u8]);

    /// A card was read and its first sector authenticated
    fn on_authentication(&self, uid: &[u8], sector: &[u8]);
}

/// Forwards RFID reads into the node loop. Never blocks the reader thread.
#[derive(Debug, Clone)]
pub struct RfidBridge {
    events: mpsc::UnboundedSender<NodeEvent>,
}

impl RfidCallback for RfidBridge {
    fn on_card_detected(&self) {}

    fn on_uid(&self, _uid: &[u8]) {}

    fn on_authentication(&self, uid: &[u8], sector: &[u8]) {
        let event = NodeEvent::CardAuthenticated {
            uid: uid.to_vec(),
            sector: sector.to_vec(),
        };
        if let Err(e) = self.events.send(event) {
            error!("Failed to forward card read to node loop: {}", e);
        }
    }
}

/// Cloneable access point to a running [`Node`]
#[derive(Clone)]
pub struct NodeHandle {
    events: mpsc::UnboundedSender<NodeEvent>,
    game: Arc<RwLock<GameState>>,
    stats: Arc<Statistics>,
}

impl NodeHandle {
    pub fn send(&self, event: NodeEvent) -> NodeResult<()> {
        self.events.send(event).map_err(|_| NodeError::ChannelClosed)
    }

    /// Issues a command on this node; it is applied, then broadcast
    pub fn issue(&self, command: PeerCommand) -> NodeResult<()> {
        self.send(NodeEvent::Command {
            command,
            origin: Origin::Local,
        })
    }

    pub fn start_game(&self) -> NodeResult<()> {
        self.issue(PeerCommand::StartGame)
    }

    pub fn stop_game(&self) -> NodeResult<()> {
        self.issue(PeerCommand::StopGame)
    }

    pub fn restart_game(&self) -> NodeResult<()> {
        self.issue(PeerCommand::RestartGame)
    }

    pub fn reset_game(&self) -> NodeResult<()> {
        self.send(NodeEvent::ResetGame)
    }

    pub fn start_test_drive(&self, driver: &str) -> NodeResult<()> {
        self.send(NodeEvent::StartTestDrive {
            driver: driver.to_string(),
        })
    }

    pub fn player_disconnected(&self, name: &str) -> NodeResult<()> {
        self.issue(PeerCommand::PlayerDisconnected {
            name: name.to_string(),
        })
    }

    pub fn player_reconnected(&self, name: &str) -> NodeResult<()> {
        self.issue(PeerCommand::PlayerReconnected {
            name: name.to_string(),
        })
    }

    pub fn shutdown(&self) -> NodeResult<()> {
        self.send(NodeEvent::Shutdown)
    }

    /// Registers a player logging in through this node
    ///
    /// A player without a robot gets a free one, preferably the robot they
    /// drove before. Returns the identifier of the robot the player drives.
    /// The updated player list is then shared with the other robots.
    pub async fn login(&self, name: &str, address: Option<IpAddr>, port: u16) -> NodeResult<Option<String>> {
        let (robot, players) = {
            let mut game = self.game.write().await;
            game.get_or_insert_player(name, address, port);
            let owned = game
                .find_robot_with_owner_name(name)
                .map(|r| r.identifier.clone());
            let robot = match owned {
                Some(identifier) => Some(identifier),
                None => match game.candidate_robot_for(name).map(|r| r.identifier.clone()) {
                    Some(identifier) => {
                        game.assign_owner(&identifier, Some(name))?;
                        info!("Player '{}' now drives robot {}", name, identifier);
                        Some(identifier)
                    }
                    None => None,
                },
            };
            (robot, game.player_summaries())
        };
        self.issue(PeerCommand::Players(players))?;
        Ok(robot)
    }

    /// Tells the other robots this node exists
    pub async fn announce_local_robot(&self) -> NodeResult<()> {
        let summary = {
            let game = self.game.read().await;
            game.find_local_robot()
                .map(Robot::summary)
                .ok_or(NodeError::NoLocalRobot)?
        };
        self.issue(PeerCommand::Robot(summary))
    }

    /// Records a measured round trip to a player
    pub async fn record_ping(&self, name: &str, rtt_ms: u64) {
        let mut game = self.game.write().await;
        if let Some(player) = game.find_player_with_name_mut(name) {
            player.ping_ms = rtt_ms;
            let addr = player.address.map(|a| a.to_string()).unwrap_or_default();
            self.stats.feed_lag(&addr, rtt_ms);
        }
    }

    /// Raw event sender, used to wire transports into the node loop
    pub fn events(&self) -> mpsc::UnboundedSender<NodeEvent> {
        self.events.clone()
    }

    pub fn rfid_bridge(&self) -> RfidBridge {
        RfidBridge {
            events: self.events.clone(),
        }
    }

    pub fn game(&self) -> Arc<RwLock<GameState>> {
        Arc::clone(&self.game)
    }

    pub fn statistics(&self) -> Arc<Statistics> {
        Arc::clone(&self.stats)
    }
}

/// Authoritative engine of one robot node
pub struct Node {
    game: Arc<RwLock<GameState>>,
    stats: Arc<Statistics>,
    config: NodeConfig,
    power_ups: PowerUps,
    walkover: WalkoverDetector,
    storage: Option<Arc<dyn LocalStorage>>,

    // Communication channels
    events_tx: mpsc::UnboundedSender<NodeEvent>,
    events_rx: mpsc::UnboundedReceiver<NodeEvent>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl Node {
    pub fn new(config: NodeConfig, game: GameState, outbound_tx: mpsc::UnboundedSender<Outbound>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Node {
            game: Arc::new(RwLock::new(game)),
            stats: Arc::new(Statistics::new()),
            power_ups: PowerUps::new(CardRegistry::new(config.card)),
            walkover: WalkoverDetector::new(config.play_mode),
            config,
            storage: None,
            events_tx,
            events_rx,
            outbound_tx,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            events: self.events_tx.clone(),
            game: Arc::clone(&self.game),
            stats: Arc::clone(&self.stats),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn storage(&self) -> Result<&dyn LocalStorage, StorageError> {
        self.storage.as_deref().ok_or(StorageError::NotConfigured)
    }

    /// Applies what the node remembers about its robot from the last run
    pub async fn restore(&self) -> NodeResult<bool> {
        let storage = self.storage()?;
        let mut game = self.game.write().await;
        storage::restore_local_robot(&mut game, storage)
    }

    /// Changes the color of the local robot and remembers it
    pub async fn set_local_color(&self, color: LedColor) -> NodeResult<()> {
        {
            let mut game = self.game.write().await;
            let robot = game.find_local_robot_mut().ok_or(NodeError::NoLocalRobot)?;
            robot.color = Some(color);
        }
        storage::remember_color(self.storage()?, color)
    }

    fn broadcast(&self, command: PeerCommand, include_robots: bool) {
        let kind = command.kind();
        if let Err(e) = self.outbound_tx.send(Outbound {
            command,
            include_robots,
        }) {
            error!("Failed to queue '{}' for broadcasting: {}", kind, e);
        }
    }

    /// Schedules a walkover check if the round lacks players
    fn watch_players(
        walkover: &mut WalkoverDetector,
        events_tx: &mpsc::UnboundedSender<NodeEvent>,
        game: &GameState,
    ) {
        if let Some(generation) = walkover.arm(game) {
            let delay = Duration::from_millis(game.abandoned_game_timeout_ms);
            walkover::spawn_timer(delay, generation, events_tx.clone());
        }
    }

    /// Processes one event, returns false when the loop must stop
    async fn handle_event(&mut self, event: NodeEvent) -> bool {
        match event {
            NodeEvent::Command { command, origin } => {
                if let Err(e) = self.handle_command(command, origin).await {
                    warn!("Command rejected: {}", e);
                }
            }
            NodeEvent::CardAuthenticated { uid, sector } => {
                let now = get_timestamp();
                let charge = {
                    let mut game = self.game.write().await;
                    self.power_ups
                        .on_authentication(&mut game, &uid, &sector, now)
                };
                if let Some(charge) = charge {
                    self.broadcast(PeerCommand::Charge(charge), true);
                }
            }
            NodeEvent::StartTestDrive { driver } => {
                let mut game = self.game.write().await;
                match lifecycle::start_test_drive(&mut game, &driver) {
                    Ok(()) => Self::watch_players(&mut self.walkover, &self.events_tx, &game),
                    Err(e) => warn!("Test drive rejected: {}", e),
                }
            }
            NodeEvent::ResetGame => {
                let mut game = self.game.write().await;
                lifecycle::reset_game(&mut game, &self.stats);
            }
            NodeEvent::WalkoverCheck { generation } => {
                let outcome = {
                    let mut game = self.game.write().await;
                    self.walkover
                        .fire(&mut game, generation, &self.stats, get_timestamp())
                };
                match outcome {
                    Ok(WalkoverOutcome::Stopped) => self.broadcast(PeerCommand::StopGame, true),
                    Ok(_) => {}
                    Err(e) => error!("Walkover check failed: {}", e),
                }
            }
            NodeEvent::Shutdown => {
                info!("Node shutting down");
                return false;
            }
        }
        true
    }

    async fn handle_command(&mut self, command: PeerCommand, origin: Origin) -> NodeResult<()> {
        debug!("Handling '{}' from {:?}", command.kind(), origin);
        let now = get_timestamp();

        match &command {
            PeerCommand::StartGame => {
                {
                    let mut game = self.game.write().await;
                    lifecycle::start_game(&mut game, now)?;
                    Self::watch_players(&mut self.walkover, &self.events_tx, &game);
                }
                self.remember_owner().await;
            }
            PeerCommand::StopGame => {
                let mut game = self.game.write().await;
                lifecycle::apply_stop_command(&mut game, self.config.play_mode, &self.stats, now)?;
            }
            PeerCommand::RestartGame => {
                let mut game = self.game.write().await;
                lifecycle::restart_game(&mut game, &self.stats);
            }
            PeerCommand::Robot(summary) => {
                if let Origin::Peer(addr) = origin {
                    self.register_remote_robot(summary, addr).await?;
                }
            }
            // A local player list is a snapshot of our own registry, only shared
            PeerCommand::Players(_) if origin == Origin::Local => {}
            PeerCommand::Players(summaries) => {
                let created = {
                    let mut game = self.game.write().await;
                    let created = game.merge_remote_players(summaries);
                    Self::watch_players(&mut self.walkover, &self.events_tx, &game);
                    created
                };
                if !created.is_empty() {
                    let summaries = created.iter().map(|p| p.summary()).collect();
                    self.broadcast(PeerCommand::Players(summaries), true);
                }
            }
            PeerCommand::PlayerDisconnected { name } | PeerCommand::PlayerReconnected { name } => {
                let online = matches!(command, PeerCommand::PlayerReconnected { .. });
                let mut game = self.game.write().await;
                let player = game
                    .find_player_with_name_mut(name)
                    .ok_or_else(|| NodeError::UnknownPlayer { name: name.clone() })?;
                player.online = online;
                info!(
                    "Player '{}' is now {}",
                    player.name,
                    if online { "online" } else { "offline" }
                );
                Self::watch_players(&mut self.walkover, &self.events_tx, &game);
            }
            PeerCommand::Charge(event) => {
                if origin != Origin::Local {
                    let mut game = self.game.write().await;
                    self.power_ups.apply_remote_charge(&mut game, event, now);
                }
            }
            PeerCommand::Hit(event) => self.apply_hit(event, now).await?,
        }

        if origin == Origin::Local {
            self.broadcast(command, true);
        }
        Ok(())
    }

    /// Registers a robot that introduced itself
    ///
    /// A robot seen for the first time gets our own introduction back, so
    /// both sides learn about each other without further round trips.
    async fn register_remote_robot(&self, summary: &RobotSummary, from: IpAddr) -> NodeResult<()> {
        let address = summary
            .address
            .as_deref()
            .and_then(|a| a.parse::<IpAddr>().ok())
            .unwrap_or(from);
        let reply = {
            let mut game = self.game.write().await;
            if game.find_local_robot().map_or(false, |r| r.identifier == summary.id) {
                warn!("Robot at {} claims our own identifier {}", from, summary.id);
                return Ok(());
            }
            let created = game.find_robot_with_identifier(&summary.id).is_none();
            let robot = game.get_or_insert_remote_robot(&summary.id, address)?;
            if let Some(color) = summary.color.as_deref().and_then(LedColor::parse) {
                robot.color = Some(color);
            }
            if created {
                game.find_local_robot().map(Robot::summary)
            } else {
                None
            }
        };
        if let Some(local) = reply {
            self.broadcast(PeerCommand::Robot(local), true);
        }
        Ok(())
    }

    async fn apply_hit(&self, event: &HitEvent, now: u64) -> NodeResult<()> {
        let mut game = self.game.write().await;
        if game.stage() != Stage::Play {
            debug!("Ignoring hit outside of a round");
            return Ok(());
        }
        rules::evaluate_hit(&mut game, &event.hit.id, &event.source.id);
        if rules::is_game_over(&game) {
            lifecycle::stop_game(&mut game, now)?;
        }
        Ok(())
    }

    /// Remembers who drives the local robot
    ///
    /// Runs after the round has started on every robot, so a storage failure
    /// is only logged: the round goes on and the next start tries again.
    async fn remember_owner(&self) {
        let Some(storage) = self.storage.as_deref() else {
            return;
        };
        let game = self.game.read().await;
        if let Err(e) = storage::remember_local_owner(&game, storage) {
            warn!("Failed to remember the local robot owner: {}", e);
        }
    }

    /// Main node loop
    pub async fn run(&mut self) -> NodeResult<()> {
        let mut card_tick = interval(self.config.card.management_delay());
        card_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Node started successfully");

        loop {
            tokio::select! {
                // Handle node events
                event = self.events_rx.recv() => {
                    match event {
                        Some(event) => {
                            if !self.handle_event(event).await {
                                break;
                            }
                        }
                        None => return Err(NodeError::ChannelClosed),
                    }
                },

                // Card management tick
                _ = card_tick.tick() => {
                    let mut game = self.game.write().await;
                    self.power_ups.update_cards(&mut game, get_timestamp());
                },
            }
        }

        Ok(())
    }
}
