//! Authoritative game registry of a node
//!
//! This module keeps everything a node knows about the running game:
//! - Current stage and round timestamps
//! - Every player, including the ones connected to other robots
//! - Every robot, including this node's own robot
//! - The power-up cards met so far
//!
//! The registry is shared by the node as `Arc<RwLock<GameState>>`, so every
//! find-then-create sequence below runs under a single write guard and can
//! never register the same player or robot twice.

use crate::card::Card;
use crate::config::NodeConfig;
use crate::entity::{Player, Robot, Stage};
use crate::error::{NodeError, NodeResult};
use log::{debug, info};
use shared::{PlayerSummary, RobotSummary, DEFAULT_ABANDONED_GAME_TIMEOUT_MS, DEFAULT_MAX_LIFE};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

/// Aggregate root holding the players, robots and cards of a game
#[derive(Debug, Clone)]
pub struct GameState {
    stage: Stage,
    /// Bumped on every stage change, lets timers detect a stale round
    generation: u64,
    /// Milliseconds since epoch when the current round started
    pub game_start: Option<u64>,
    /// Milliseconds since epoch when the last round stopped
    pub game_stop: Option<u64>,
    /// Grace period before a round without enough players is terminated
    pub abandoned_game_timeout_ms: u64,
    pub max_life: u32,
    players: Vec<Player>,
    robots: Vec<Robot>,
    /// Remote robot address -> robot identifier
    known_robot_addresses: HashMap<IpAddr, String>,
    cards: HashMap<String, Card>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LIFE, DEFAULT_ABANDONED_GAME_TIMEOUT_MS)
    }
}

impl GameState {
    /// Creates an empty registry in the lobby stage
    pub fn new(max_life: u32, abandoned_game_timeout_ms: u64) -> Self {
        Self {
            stage: Stage::Init,
            generation: 0,
            game_start: None,
            game_stop: None,
            abandoned_game_timeout_ms,
            max_life,
            players: Vec::new(),
            robots: Vec::new(),
            known_robot_addresses: HashMap::new(),
            cards: HashMap::new(),
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.max_life, config.abandoned_game_timeout_ms)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Changes the stage and starts a new generation.
    ///
    /// No transition rule is checked here; the lifecycle module decides
    /// which transitions are legal.
    pub fn set_stage(&mut self, stage: Stage) {
        if self.stage != stage {
            info!("Game stage {:?} -> {:?}", self.stage, stage);
        }
        self.stage = stage;
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ---- players ----

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    /// Registers a new player
    ///
    /// Player names are the identity key of a player across the whole arena,
    /// so a second player with the same name (ignoring case) is rejected.
    pub fn add_player(&mut self, player: Player) -> NodeResult<()> {
        if self.find_player_with_name(&player.name).is_some() {
            return Err(NodeError::DuplicatePlayer { name: player.name });
        }
        info!("Player '{}' joined the game", player.name);
        self.players.push(player);
        Ok(())
    }

    /// Finds a player by name, registering a new one if nobody has it yet
    ///
    /// Used on login: the address and port of an existing player are
    /// refreshed, and the player is marked online either way.
    pub fn get_or_insert_player(&mut self, name: &str, address: Option<IpAddr>, port: u16) -> &mut Player {
        let index = match self.players.iter().position(|p| p.has_name(name)) {
            Some(index) => {
                let player = &mut self.players[index];
                if address.is_some() {
                    player.address = address;
                    player.port = port;
                }
                index
            }
            None => {
                info!("Player '{}' joined the game", name);
                self.players.push(Player::new(name, address, port));
                self.players.len() - 1
            }
        };
        let player = &mut self.players[index];
        player.online = true;
        player
    }

    /// Removes a player from the game
    ///
    /// Robots owned by the player keep the stale owner name until the next
    /// restart drops it, which is the accepted behavior between collections.
    pub fn remove_player(&mut self, name: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.has_name(name))?;
        let player = self.players.remove(index);
        info!("Player '{}' removed from the game", player.name);
        Some(player)
    }

    /// Finds a player by name, ignoring case
    pub fn find_player_with_name(&self, name: &str) -> Option<&Player> {
        if name.is_empty() {
            return None;
        }
        self.players.iter().find(|p| p.has_name(name))
    }

    pub fn find_player_with_name_mut(&mut self, name: &str) -> Option<&mut Player> {
        if name.is_empty() {
            return None;
        }
        self.players.iter_mut().find(|p| p.has_name(name))
    }

    /// Finds a player by network address
    ///
    /// A port of 0, given or stored, matches any port. Players connected
    /// through the same address on different ports are told apart only
    /// when both ports are known.
    pub fn find_player_with_address(&self, address: IpAddr, port: u16) -> Option<&Player> {
        self.players.iter().find(|p| {
            if p.address != Some(address) {
                return false;
            }
            port == 0 || p.port == 0 || p.port == port
        })
    }

    /// Finds a player by HTTP session token, ignoring case
    pub fn find_player_with_session(&self, session: &str) -> Option<&Player> {
        if session.is_empty() {
            return None;
        }
        self.players.iter().find(|p| {
            p.session
                .as_deref()
                .map_or(false, |s| s.eq_ignore_ascii_case(session))
        })
    }

    /// Merges the player list received from another robot with ours
    ///
    /// Known names only get their online flag refreshed, unknown names are
    /// registered. Returns the players created by this call so the caller
    /// can tell the rest of the arena about them. Replaying the same list
    /// creates nothing.
    ///
    /// When two addresses claim the same name the first registered player
    /// wins and the other address is ignored.
    pub fn merge_remote_players(&mut self, summaries: &[PlayerSummary]) -> Vec<Player> {
        let mut new_players = Vec::new();
        for summary in summaries {
            if let Some(existing) = self.find_player_with_name_mut(&summary.name) {
                if let Some(remote) = summary.address.as_deref() {
                    let known = existing.address.map(|a| a.to_string());
                    if known.as_deref() != Some(remote) {
                        debug!(
                            "Player '{}' reported at {} but already known at {:?}",
                            summary.name, remote, known
                        );
                    }
                }
                existing.online = summary.online;
                continue;
            }
            let player = Player::from_summary(summary);
            info!("Player '{}' learned from another robot", player.name);
            new_players.push(player.clone());
            self.players.push(player);
        }
        new_players
    }

    pub fn players_addresses(&self) -> HashSet<IpAddr> {
        self.players.iter().filter_map(|p| p.address).collect()
    }

    pub fn player_summaries(&self) -> Vec<PlayerSummary> {
        self.players.iter().map(Player::summary).collect()
    }

    /// Returns the online players that did not leave the summary screen yet
    pub fn players_pending_summary(&self) -> Vec<String> {
        self.players
            .iter()
            .filter(|p| p.online && !p.dismissed_summary)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Checks if every online player already dismissed the summary screen
    pub fn has_all_players_dismissed_summary(&self) -> bool {
        !self.players.is_empty() && self.players_pending_summary().is_empty()
    }

    // ---- robots ----

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn robots_mut(&mut self) -> impl Iterator<Item = &mut Robot> {
        self.robots.iter_mut()
    }

    /// Registers a robot
    ///
    /// Fails if the identifier is taken, or if the robot is local while a
    /// local robot already exists. Remote robots are indexed by address.
    pub fn add_robot(&mut self, robot: Robot) -> NodeResult<()> {
        if self.find_robot_with_identifier(&robot.identifier).is_some() {
            return Err(NodeError::DuplicateRobot {
                identifier: robot.identifier,
            });
        }
        match robot.address {
            None if self.find_local_robot().is_some() => return Err(NodeError::LocalRobotExists),
            None => {}
            Some(addr) => {
                self.known_robot_addresses
                    .insert(addr, robot.identifier.clone());
            }
        }
        info!("Robot {} registered", robot);
        self.robots.push(robot);
        Ok(())
    }

    /// Finds a remote robot by address, registering it on first sight
    pub fn get_or_insert_remote_robot(&mut self, identifier: &str, address: IpAddr) -> NodeResult<&mut Robot> {
        let index = match self
            .robots
            .iter()
            .position(|r| r.identifier == identifier)
        {
            Some(index) => index,
            None => {
                self.add_robot(Robot::new_remote(identifier, address))?;
                self.robots.len() - 1
            }
        };
        Ok(&mut self.robots[index])
    }

    pub fn remove_robot(&mut self, identifier: &str) -> Option<Robot> {
        let index = self
            .robots
            .iter()
            .position(|r| r.identifier == identifier)?;
        let robot = self.robots.remove(index);
        if let Some(addr) = robot.address {
            self.known_robot_addresses.remove(&addr);
        }
        info!("Robot {} removed", robot);
        Some(robot)
    }

    /// Returns all robots sorted by identifier
    ///
    /// Every node eventually knows the same set of robots, so every node
    /// computes the same ordering here. Short ids are handed out in this
    /// order, which keeps them consistent across the arena without any
    /// coordination.
    pub fn ordered_robots(&self) -> Vec<&Robot> {
        let mut robots: Vec<&Robot> = self.robots.iter().collect();
        robots.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        robots
    }

    pub fn find_local_robot(&self) -> Option<&Robot> {
        self.robots.iter().find(|r| r.is_local())
    }

    pub fn find_local_robot_mut(&mut self) -> Option<&mut Robot> {
        self.robots.iter_mut().find(|r| r.is_local())
    }

    pub fn find_robot_with_identifier(&self, identifier: &str) -> Option<&Robot> {
        self.robots.iter().find(|r| r.identifier == identifier)
    }

    pub fn find_robot_with_identifier_mut(&mut self, identifier: &str) -> Option<&mut Robot> {
        self.robots.iter_mut().find(|r| r.identifier == identifier)
    }

    /// Finds a robot by address, `None` meaning this node's own robot
    pub fn find_robot_with_address(&self, address: Option<IpAddr>) -> Option<&Robot> {
        self.robots.iter().find(|r| r.address == address)
    }

    pub fn find_robot_with_address_mut(&mut self, address: Option<IpAddr>) -> Option<&mut Robot> {
        self.robots.iter_mut().find(|r| r.address == address)
    }

    /// Finds the robot owned by a player, ignoring case
    pub fn find_robot_with_owner_name(&self, name: &str) -> Option<&Robot> {
        if name.is_empty() {
            return None;
        }
        self.robots.iter().find(|r| r.is_owned_by(name))
    }

    pub fn find_robot_with_owner_name_mut(&mut self, name: &str) -> Option<&mut Robot> {
        if name.is_empty() {
            return None;
        }
        self.robots.iter_mut().find(|r| r.is_owned_by(name))
    }

    pub fn find_robot_with_short_id(&self, short_id: u8) -> Option<&Robot> {
        self.robots.iter().find(|r| r.short_id == short_id)
    }

    pub fn has_other_robots(&self) -> bool {
        !self.known_robot_addresses.is_empty()
    }

    /// The local robot (`None`) is always considered present
    pub fn has_robot_with_address(&self, address: Option<IpAddr>) -> bool {
        match address {
            Some(addr) => self.known_robot_addresses.contains_key(&addr),
            None => true,
        }
    }

    pub fn other_robots_addresses(&self) -> Vec<IpAddr> {
        self.known_robot_addresses.keys().copied().collect()
    }

    /// Checks if every known robot is ready to start a round
    pub fn has_all_robots_ready(&self) -> bool {
        !self.robots.is_empty() && self.robots.iter().all(|r| r.ready)
    }

    /// Checks if the named player owns this node's robot
    pub fn is_owner_of_local_robot(&self, name: &str) -> bool {
        self.find_local_robot()
            .map_or(false, |robot| robot.is_owned_by(name))
    }

    /// Hands a robot over to a player, or frees it when `owner` is `None`
    ///
    /// A player drives at most one robot: any other robot owned by the same
    /// player is released first.
    pub fn assign_owner(&mut self, identifier: &str, owner: Option<&str>) -> NodeResult<()> {
        if self.find_robot_with_identifier(identifier).is_none() {
            return Err(NodeError::UnknownRobot {
                identifier: identifier.to_string(),
            });
        }
        let owner = match owner {
            Some(name) => Some(
                self.find_player_with_name(name)
                    .map(|p| p.name.clone())
                    .ok_or_else(|| NodeError::UnknownPlayer {
                        name: name.to_string(),
                    })?,
            ),
            None => None,
        };

        if let Some(name) = owner.as_deref() {
            for robot in self.robots.iter_mut() {
                if robot.identifier != identifier && robot.is_owned_by(name) {
                    robot.owner = None;
                }
            }
        }
        if let Some(robot) = self.find_robot_with_identifier_mut(identifier) {
            if let Some(name) = owner.as_deref() {
                robot.previous_owner = Some(name.to_string());
            }
            robot.owner = owner;
        }
        Ok(())
    }

    /// Picks a free robot for a player who does not drive one yet
    ///
    /// Prefers the robot this player drove before; otherwise the first free
    /// robot. Returns `None` if the player already owns a robot.
    pub fn candidate_robot_for(&self, name: &str) -> Option<&Robot> {
        if self.find_robot_with_owner_name(name).is_some() {
            return None;
        }
        let mut free = self.robots.iter().filter(|r| r.owner.is_none());
        let first = free.clone().next();
        free.find(|r| {
            r.previous_owner
                .as_deref()
                .map_or(false, |p| p.eq_ignore_ascii_case(name))
        })
        .or(first)
    }

    pub fn robot_summaries(&self) -> Vec<RobotSummary> {
        self.robots.iter().map(Robot::summary).collect()
    }

    // ---- cards ----

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub fn cards_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.values_mut()
    }

    pub fn add_card(&mut self, card: Card) {
        debug!("Card '{}' registered", card.id());
        self.cards.insert(card.id().to_string(), card);
    }

    pub fn remove_card(&mut self, id: &str) -> Option<Card> {
        self.cards.remove(id)
    }

    pub fn find_card(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn find_card_mut(&mut self, id: &str) -> Option<&mut Card> {
        self.cards.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardRegistry;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn game_with_robots(ids: &[&str]) -> GameState {
        let mut game = GameState::default();
        for (i, id) in ids.iter().enumerate() {
            let robot = if i == 0 {
                Robot::new_local(id)
            } else {
                Robot::new_remote(id, addr(&format!("10.0.0.{}", i + 1)))
            };
            game.add_robot(robot).unwrap();
        }
        game
    }

    #[test]
    fn test_game_state_creation() {
        let game = GameState::default();
        assert_eq!(game.stage(), Stage::Init);
        assert_eq!(game.max_life, 10);
        assert_eq!(game.abandoned_game_timeout_ms, 5000);
        assert!(game.players().is_empty());
        assert!(game.robots().is_empty());
        assert!(game.game_start.is_none());
    }

    #[test]
    fn test_set_stage_bumps_generation() {
        let mut game = GameState::default();
        let before = game.generation();
        game.set_stage(Stage::Play);
        assert_eq!(game.stage(), Stage::Play);
        assert!(game.generation() > before);
    }

    #[test]
    fn test_add_player_rejects_duplicate_name() {
        let mut game = GameState::default();
        game.add_player(Player::new("Alice", None, 0)).unwrap();
        let result = game.add_player(Player::new("ALICE", Some(addr("10.0.0.9")), 0));
        assert!(matches!(result, Err(NodeError::DuplicatePlayer { .. })));
        assert_eq!(game.players().len(), 1);
    }

    #[test]
    fn test_get_or_insert_player() {
        let mut game = GameState::default();
        game.get_or_insert_player("alice", Some(addr("10.0.1.1")), 5000);
        let player = game.get_or_insert_player("Alice", Some(addr("10.0.1.2")), 5001);
        assert!(player.online);
        assert_eq!(player.name, "alice");
        assert_eq!(player.address, Some(addr("10.0.1.2")));
        assert_eq!(player.port, 5001);
        assert_eq!(game.players().len(), 1);
    }

    #[test]
    fn test_find_player_with_name() {
        let mut game = GameState::default();
        game.add_player(Player::new("Alice", None, 0)).unwrap();
        assert!(game.find_player_with_name("alice").is_some());
        assert!(game.find_player_with_name("bob").is_none());
        assert!(game.find_player_with_name("").is_none());
    }

    #[test]
    fn test_find_player_with_address_and_port() {
        let mut game = GameState::default();
        game.add_player(Player::new("alice", Some(addr("10.0.1.1")), 5000))
            .unwrap();
        game.add_player(Player::new("bob", Some(addr("10.0.1.1")), 5001))
            .unwrap();
        game.add_player(Player::new("carol", Some(addr("10.0.1.2")), 0))
            .unwrap();

        let found = game.find_player_with_address(addr("10.0.1.1"), 5001).unwrap();
        assert_eq!(found.name, "bob");
        // No port given: first match wins
        let found = game.find_player_with_address(addr("10.0.1.1"), 0).unwrap();
        assert_eq!(found.name, "alice");
        // Unknown stored port matches any port
        let found = game.find_player_with_address(addr("10.0.1.2"), 7777).unwrap();
        assert_eq!(found.name, "carol");
        assert!(game.find_player_with_address(addr("10.0.1.3"), 0).is_none());
        assert!(game.find_player_with_address(addr("10.0.1.1"), 6000).is_none());
    }

    #[test]
    fn test_find_player_with_session() {
        let mut game = GameState::default();
        let mut player = Player::new("alice", None, 0);
        player.session = Some("ABC123".to_string());
        game.add_player(player).unwrap();
        game.add_player(Player::new("bob", None, 0)).unwrap();

        assert_eq!(game.find_player_with_session("abc123").unwrap().name, "alice");
        assert!(game.find_player_with_session("zzz").is_none());
        assert!(game.find_player_with_session("").is_none());
    }

    #[test]
    fn test_merge_remote_players_creates_new_players() {
        let mut game = GameState::default();
        game.add_player(Player::new("alice", Some(addr("10.0.1.1")), 0))
            .unwrap();

        let summary = vec![
            PlayerSummary::new("Alice", Some("10.0.1.1"), 0, true),
            PlayerSummary::new("bob", Some("10.0.1.2"), 8080, true),
        ];
        let created = game.merge_remote_players(&summary);

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "bob");
        assert_eq!(game.players().len(), 2);
        assert!(game.find_player_with_name("alice").unwrap().online);
    }

    #[test]
    fn test_merge_remote_players_is_idempotent() {
        let mut game = GameState::default();
        let summary = vec![
            PlayerSummary::new("alice", Some("10.0.1.1"), 0, true),
            PlayerSummary::new("bob", Some("10.0.1.2"), 0, false),
        ];
        let first = game.merge_remote_players(&summary);
        let players_after_first = game.players().to_vec();
        let second = game.merge_remote_players(&summary);

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(game.players(), players_after_first.as_slice());
    }

    #[test]
    fn test_merge_remote_players_only_refreshes_online_flag() {
        let mut game = GameState::default();
        let mut alice = Player::new("alice", Some(addr("10.0.1.1")), 4000);
        alice.online = true;
        alice.dismissed_summary = true;
        game.add_player(alice).unwrap();

        // Same name from a different address: first registration wins
        let summary = vec![PlayerSummary::new("alice", Some("10.9.9.9"), 1234, false)];
        assert!(game.merge_remote_players(&summary).is_empty());

        let alice = game.find_player_with_name("alice").unwrap();
        assert!(!alice.online);
        assert!(alice.dismissed_summary);
        assert_eq!(alice.address, Some(addr("10.0.1.1")));
        assert_eq!(alice.port, 4000);
    }

    #[test]
    fn test_merge_empty_summary_is_noop() {
        let mut game = GameState::default();
        assert!(game.merge_remote_players(&[]).is_empty());
        assert!(game.players().is_empty());
    }

    #[test]
    fn test_add_robot_rejects_second_local_robot() {
        let mut game = GameState::default();
        game.add_robot(Robot::new_local("r1")).unwrap();
        let result = game.add_robot(Robot::new_local("r2"));
        assert!(matches!(result, Err(NodeError::LocalRobotExists)));
        assert_eq!(game.robots().iter().filter(|r| r.is_local()).count(), 1);
    }

    #[test]
    fn test_add_robot_rejects_duplicate_identifier() {
        let mut game = game_with_robots(&["r1", "r2"]);
        let result = game.add_robot(Robot::new_remote("r2", addr("10.0.0.9")));
        assert!(matches!(result, Err(NodeError::DuplicateRobot { .. })));
        assert!(!game.has_robot_with_address(Some(addr("10.0.0.9"))));
    }

    #[test]
    fn test_robot_address_index() {
        let mut game = game_with_robots(&["r1"]);
        assert!(!game.has_other_robots());
        assert!(game.has_robot_with_address(None));

        game.add_robot(Robot::new_remote("r2", addr("10.0.0.2")))
            .unwrap();
        assert!(game.has_other_robots());
        assert!(game.has_robot_with_address(Some(addr("10.0.0.2"))));
        assert_eq!(game.other_robots_addresses(), vec![addr("10.0.0.2")]);

        game.remove_robot("r2").unwrap();
        assert!(!game.has_other_robots());
        assert!(game.remove_robot("r2").is_none());
    }

    #[test]
    fn test_get_or_insert_remote_robot() {
        let mut game = game_with_robots(&["r1"]);
        game.get_or_insert_remote_robot("r9", addr("10.0.0.9"))
            .unwrap()
            .life = 3;
        let robot = game
            .get_or_insert_remote_robot("r9", addr("10.0.0.9"))
            .unwrap();
        assert_eq!(robot.life, 3);
        assert_eq!(game.robots().len(), 2);
    }

    #[test]
    fn test_ordered_robots() {
        let game = game_with_robots(&["m", "c", "x", "a"]);
        let ids: Vec<&str> = game
            .ordered_robots()
            .iter()
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c", "m", "x"]);
    }

    #[test]
    fn test_find_robot_with_address() {
        let game = game_with_robots(&["r1", "r2"]);
        assert_eq!(game.find_robot_with_address(None).unwrap().identifier, "r1");
        assert_eq!(
            game.find_robot_with_address(Some(addr("10.0.0.2")))
                .unwrap()
                .identifier,
            "r2"
        );
        assert!(game.find_robot_with_address(Some(addr("10.0.0.7"))).is_none());
    }

    #[test]
    fn test_find_robot_with_short_id() {
        let mut game = game_with_robots(&["r1", "r2"]);
        game.find_robot_with_identifier_mut("r2").unwrap().short_id = 2;
        assert_eq!(game.find_robot_with_short_id(2).unwrap().identifier, "r2");
        assert!(game.find_robot_with_short_id(7).is_none());
    }

    #[test]
    fn test_assign_owner_keeps_one_robot_per_player() {
        let mut game = game_with_robots(&["r1", "r2"]);
        game.add_player(Player::new("Alice", None, 0)).unwrap();

        game.assign_owner("r1", Some("alice")).unwrap();
        assert!(game.is_owner_of_local_robot("ALICE"));

        game.assign_owner("r2", Some("alice")).unwrap();
        assert!(!game.is_owner_of_local_robot("alice"));
        let owned = game.find_robot_with_owner_name("alice").unwrap();
        assert_eq!(owned.identifier, "r2");
        assert_eq!(owned.owner.as_deref(), Some("Alice"));
        assert_eq!(owned.previous_owner.as_deref(), Some("Alice"));

        game.assign_owner("r2", None).unwrap();
        assert!(game.find_robot_with_owner_name("alice").is_none());
    }

    #[test]
    fn test_assign_owner_errors() {
        let mut game = game_with_robots(&["r1"]);
        assert!(matches!(
            game.assign_owner("r1", Some("ghost")),
            Err(NodeError::UnknownPlayer { .. })
        ));
        assert!(matches!(
            game.assign_owner("nope", None),
            Err(NodeError::UnknownRobot { .. })
        ));
    }

    #[test]
    fn test_candidate_robot_prefers_previous_owner() {
        let mut game = game_with_robots(&["r1", "r2", "r3"]);
        game.add_player(Player::new("alice", None, 0)).unwrap();
        game.find_robot_with_identifier_mut("r3")
            .unwrap()
            .previous_owner = Some("Alice".to_string());

        assert_eq!(game.candidate_robot_for("alice").unwrap().identifier, "r3");
        assert_eq!(game.candidate_robot_for("bob").unwrap().identifier, "r1");

        game.assign_owner("r3", Some("alice")).unwrap();
        assert!(game.candidate_robot_for("alice").is_none());
    }

    #[test]
    fn test_all_robots_ready() {
        let mut game = GameState::default();
        assert!(!game.has_all_robots_ready());

        let mut game_2 = game_with_robots(&["r1", "r2"]);
        assert!(!game_2.has_all_robots_ready());
        for robot in game_2.robots_mut() {
            robot.ready = true;
        }
        assert!(game_2.has_all_robots_ready());

        game.add_robot(Robot::new_local("r1")).unwrap();
        assert!(!game.has_all_robots_ready());
    }

    #[test]
    fn test_players_dismissed_summary() {
        let mut game = GameState::default();
        assert!(!game.has_all_players_dismissed_summary());

        let mut alice = Player::new("alice", None, 0);
        alice.online = true;
        let mut bob = Player::new("bob", None, 0);
        bob.online = false;
        game.add_player(alice).unwrap();
        game.add_player(bob).unwrap();

        assert_eq!(game.players_pending_summary(), vec!["alice".to_string()]);
        game.find_player_with_name_mut("alice")
            .unwrap()
            .dismissed_summary = true;
        assert!(game.has_all_players_dismissed_summary());
    }

    #[test]
    fn test_cards_registry() {
        let mut game = GameState::default();
        let registry = CardRegistry::default();
        game.add_card(registry.create_default("1 2 3"));
        assert!(game.find_card("1 2 3").is_some());
        assert_eq!(game.cards().count(), 1);
        game.find_card_mut("1 2 3").unwrap().timestamp = 10;
        assert_eq!(game.find_card("1 2 3").unwrap().timestamp, 10);
        assert!(game.remove_card("1 2 3").is_some());
        assert!(game.find_card("1 2 3").is_none());
    }

    #[test]
    fn test_summaries() {
        let mut game = game_with_robots(&["r1"]);
        game.add_player(Player::new("alice", Some(addr("10.0.1.1")), 80))
            .unwrap();
        let players = game.player_summaries();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].address.as_deref(), Some("10.0.1.1"));
        let robots = game.robot_summaries();
        assert_eq!(robots[0].id, "r1");
        assert!(robots[0].address.is_none());
        assert_eq!(game.players_addresses().len(), 1);
    }
}
