//! # Arena Node Library
//!
//! This library provides the authoritative game engine running on every robot
//! of a laser arena. Each robot keeps its own copy of the game and applies the
//! commands broadcast by the other robots, so the arena converges without any
//! leader.
//!
//! ## Core Responsibilities
//!
//! ### Game Registry
//! Keeps every player, robot and power-up card the node knows about, with the
//! lookups used by the web layer and the peer protocol:
//! - Players by name, address, or session
//! - Robots by identifier, address, owner, or short id
//! - Merging of player lists received from other robots
//!
//! ### Round Lifecycle
//! Moves the game between the lobby, a running round and the summary screen.
//! Short ids are handed out in identifier order, so every robot computes the
//! same ids for the same set of robots.
//!
//! ### Walkover Detection
//! Terminates a round when too few players remain online, after a grace
//! period that lets dropped players reconnect.
//!
//! ### Power-Ups
//! RFID cards on the arena floor recharge the robot standing on them. Cards
//! refill themselves slowly while nobody uses them.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! The [`node::Node`] processes every event sequentially: lifecycle commands,
//! peer commands, card reads, walkover checks and the card management tick.
//! The registry itself is shared as `Arc<RwLock<GameState>>` so web handlers
//! can read it concurrently.
//!
//! ### Local First Broadcasting
//! A command issued on this node is applied locally, then queued for
//! broadcasting. Broadcast failures are logged and never undo local changes.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The registry of players, robots and cards.
//!
//! ### Lifecycle Module (`lifecycle`)
//! Reset, test drive, start, restart and stop transitions.
//!
//! ### Rules Module (`rules`)
//! Movement and fire permissions, hit evaluation, end of round detection.
//!
//! ### Card and Power-Ups Modules (`card`, `power_ups`)
//! Card behaviors and the recharge economy.
//!
//! ### Walkover Module (`walkover`)
//! Abandoned round detection.
//!
//! ### Statistics Module (`statistics`)
//! Round-trip times per address and IR counters.
//!
//! ### Network and Storage Modules (`network`, `storage`)
//! Peer transport and the data a robot remembers across restarts.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use node::config::NodeConfig;
//! use node::entity::Robot;
//! use node::game::GameState;
//! use node::node::Node;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::default();
//!     let mut game = GameState::from_config(&config);
//!     game.add_robot(Robot::new_local("b8:27:eb:00:00:01"))?;
//!
//!     // Commands to broadcast show up on this channel
//!     let (outbound_tx, _outbound_rx) = mpsc::unbounded_channel();
//!     let mut node = Node::new(config, game, outbound_tx);
//!
//!     let handle = node.handle();
//!     handle.start_game()?;
//!     handle.shutdown()?;
//!
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod card;
pub mod config;
pub mod entity;
pub mod error;
pub mod game;
pub mod lifecycle;
pub mod network;
pub mod node;
pub mod power_ups;
pub mod rules;
pub mod statistics;
pub mod storage;
pub mod utils;
pub mod walkover;
