//! Power-up economy driven by the RFID reader under the robot
//!
//! Recharging happens through timestamps only: the reader reports the same
//! card over and over while the robot stands on it, and each report either
//! arms the recharge, moves one charge unit into the robot or does nothing.

use crate::card::{card_id_from_uid, CardKind, CardRegistry};
use crate::entity::Stage;
use crate::game::GameState;
use log::{debug, warn};
use shared::{ChargeEvent, RobotSummary};

pub struct PowerUps {
    registry: CardRegistry,
    /// When the current recharge was armed, 0 when idle
    previous_recharge: u64,
}

impl PowerUps {
    pub fn new(registry: CardRegistry) -> Self {
        Self {
            registry,
            previous_recharge: 0,
        }
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    /// Handles a card read by the local RFID reader
    ///
    /// Unknown cards are registered on first sight. The sector content is
    /// not interpreted. Returns the event the caller should broadcast, if
    /// any.
    pub fn on_authentication(
        &mut self,
        game: &mut GameState,
        uid: &[u8],
        _sector: &[u8],
        now: u64,
    ) -> Option<ChargeEvent> {
        let card_id = card_id_from_uid(uid);
        if game.find_card(&card_id).is_none() {
            debug!("New card found in game: {}", card_id);
            game.add_card(self.registry.create_default(&card_id));
        }
        let card = game.find_card_mut(&card_id)?;
        card.timestamp = now;
        let is_recharger = matches!(card.kind(), CardKind::Recharger(_));

        if is_recharger {
            self.on_recharge(game, &card_id, now)
        } else {
            warn!("Unknown card type for card {}", card_id);
            None
        }
    }

    fn on_recharge(&mut self, game: &mut GameState, card_id: &str, now: u64) -> Option<ChargeEvent> {
        let max_life = game.max_life;
        let config = *self.registry.config();
        let local = game.find_local_robot()?.summary();

        let card = game.find_card_mut(card_id)?;
        let card_type = card.card_type();
        let recharger = card.as_recharger_mut()?;

        if recharger.is_depleted() {
            debug!("Card {} is depleted", card_id);
            return Some(ChargeEvent {
                card: card_id.to_string(),
                card_type,
                charging: local,
                remaining: 0,
                full: false,
                depleted: true,
            });
        }

        let full = local.life >= max_life;
        let mut transferred = false;
        if !full {
            let elapsed = now.saturating_sub(self.previous_recharge);
            if self.previous_recharge == 0 || elapsed > config.power_up_timeout_ms {
                self.previous_recharge = now;
            } else if elapsed > config.depletion_interval_ms && recharger.take_charge() {
                self.previous_recharge = now;
                transferred = true;
            }
        }
        let remaining = recharger.charges();

        let mut charging = local;
        if transferred {
            let robot = game.find_local_robot_mut()?;
            robot.life = (robot.life + 1).min(max_life);
            debug!("Robot {} recharged to {} from card {}", robot, robot.life, card_id);
            charging = robot.summary();
        }

        Some(ChargeEvent {
            card: card_id.to_string(),
            card_type,
            charging,
            remaining,
            full,
            depleted: false,
        })
    }

    /// Card management tick. Cards only change while a round is running.
    pub fn update_cards(&self, game: &mut GameState, now: u64) {
        if game.stage() != Stage::Play {
            return;
        }
        for card in game.cards_mut() {
            card.update(now);
        }
    }

    /// Applies a charge event reported by another robot
    ///
    /// Returns false when the event was ignored.
    pub fn apply_remote_charge(&self, game: &mut GameState, event: &ChargeEvent, now: u64) -> bool {
        let stale = game
            .find_card(&event.card)
            .map_or(false, |card| card.card_type() != event.card_type);
        if stale {
            game.remove_card(&event.card);
        }

        match game.find_card_mut(&event.card) {
            Some(card) => {
                if let Some(recharger) = card.as_recharger_mut() {
                    recharger.set_charges(event.remaining);
                }
                card.timestamp = now;
            }
            None => match self.registry.create(event.card_type, &event.card) {
                Some(mut card) => {
                    card.timestamp = now;
                    game.add_card(card);
                }
                None => {
                    warn!("Wrong card type: {:?}", event.card_type);
                    return false;
                }
            },
        }

        update_robot_life(game, &event.charging)
    }
}

fn update_robot_life(game: &mut GameState, summary: &RobotSummary) -> bool {
    match game.find_robot_with_identifier_mut(&summary.id) {
        Some(robot) => {
            robot.life = summary.life;
            true
        }
        None => {
            debug!("Charge reported for unknown robot {}", summary.id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Robot;
    use shared::CardType;

    const UID: [u8; 4] = [4, 170, 255, 9];
    const CARD: &str = "4 170 255 9";

    fn game_with_life(life: u32) -> GameState {
        let mut game = GameState::default();
        let mut robot = Robot::new_local("r1");
        robot.life = life;
        game.add_robot(robot).unwrap();
        game.set_stage(Stage::Play);
        game
    }

    fn local_life(game: &GameState) -> u32 {
        game.find_local_robot().unwrap().life
    }

    fn charges(game: &mut GameState) -> u32 {
        game.find_card_mut(CARD)
            .unwrap()
            .as_recharger_mut()
            .unwrap()
            .charges()
    }

    #[test]
    fn test_unknown_card_is_registered() {
        let mut game = game_with_life(10);
        let mut power_ups = PowerUps::new(CardRegistry::default());

        let event = power_ups
            .on_authentication(&mut game, &UID, &[], 1_000)
            .unwrap();

        let card = game.find_card(CARD).unwrap();
        assert_eq!(card.timestamp, 1_000);
        assert_eq!(card.card_type(), CardType::ChargeLife);
        assert!(event.full);
        assert!(!event.depleted);
        assert_eq!(event.remaining, 5);
        assert_eq!(event.charging.id, "r1");
    }

    #[test]
    fn test_debounced_recharge() {
        let mut game = game_with_life(7);
        let mut power_ups = PowerUps::new(CardRegistry::default());

        // First read only arms the recharge
        let event = power_ups.on_authentication(&mut game, &UID, &[], 10_000).unwrap();
        assert_eq!(local_life(&game), 7);
        assert_eq!(event.remaining, 5);

        // Depletion interval must strictly elapse
        power_ups.on_authentication(&mut game, &UID, &[], 11_000);
        assert_eq!(local_life(&game), 7);

        let event = power_ups.on_authentication(&mut game, &UID, &[], 11_001).unwrap();
        assert_eq!(local_life(&game), 8);
        assert_eq!(event.remaining, 4);
        assert_eq!(event.charging.life, 8);
        assert!(!event.full);

        power_ups.on_authentication(&mut game, &UID, &[], 12_002);
        assert_eq!(local_life(&game), 9);
        assert_eq!(charges(&mut game), 3);
    }

    #[test]
    fn test_recharge_rearms_after_timeout() {
        let mut game = game_with_life(5);
        let mut power_ups = PowerUps::new(CardRegistry::default());

        power_ups.on_authentication(&mut game, &UID, &[], 10_000);
        // Gap larger than the power-up timeout: arm again, no transfer
        power_ups.on_authentication(&mut game, &UID, &[], 13_001);
        assert_eq!(local_life(&game), 5);
        power_ups.on_authentication(&mut game, &UID, &[], 14_002);
        assert_eq!(local_life(&game), 6);
    }

    #[test]
    fn test_full_robot_takes_nothing() {
        let mut game = game_with_life(10);
        let mut power_ups = PowerUps::new(CardRegistry::default());
        for t in [10_000, 11_500, 13_000] {
            let event = power_ups.on_authentication(&mut game, &UID, &[], t).unwrap();
            assert!(event.full);
        }
        assert_eq!(local_life(&game), 10);
        assert_eq!(charges(&mut game), 5);
    }

    #[test]
    fn test_depleted_card() {
        let mut game = game_with_life(2);
        let mut power_ups = PowerUps::new(CardRegistry::default());
        power_ups.on_authentication(&mut game, &UID, &[], 1_000);
        game.find_card_mut(CARD)
            .unwrap()
            .as_recharger_mut()
            .unwrap()
            .set_charges(0);

        let event = power_ups.on_authentication(&mut game, &UID, &[], 1_500).unwrap();
        assert!(event.depleted);
        assert_eq!(event.remaining, 0);
        assert_eq!(local_life(&game), 2);
    }

    #[test]
    fn test_card_never_goes_below_zero() {
        let mut game = game_with_life(1);
        game.max_life = 50;
        let mut power_ups = PowerUps::new(CardRegistry::default());
        let mut now = 10_000;
        for _ in 0..20 {
            power_ups.on_authentication(&mut game, &UID, &[0xde, 0xad], now);
            now += 1_001;
        }
        assert_eq!(charges(&mut game), 0);
        assert_eq!(local_life(&game), 6);
    }

    #[test]
    fn test_no_local_robot() {
        let mut game = GameState::default();
        let mut power_ups = PowerUps::new(CardRegistry::default());
        assert!(power_ups.on_authentication(&mut game, &UID, &[], 1_000).is_none());
        // The card is still known afterwards
        assert!(game.find_card(CARD).is_some());
    }

    #[test]
    fn test_update_cards_only_during_play() {
        let mut game = game_with_life(10);
        let power_ups = PowerUps::new(CardRegistry::default());
        let mut card = power_ups.registry().create_default(CARD);
        card.as_recharger_mut().unwrap().set_charges(1);
        game.add_card(card);

        game.set_stage(Stage::Summary);
        power_ups.update_cards(&mut game, 100_000);
        assert_eq!(charges(&mut game), 1);

        game.set_stage(Stage::Play);
        power_ups.update_cards(&mut game, 100_000);
        assert_eq!(charges(&mut game), 2);
    }

    #[test]
    fn test_apply_remote_charge() {
        let mut game = game_with_life(10);
        game.add_robot(Robot::new_remote("r2", "10.0.0.2".parse().unwrap()))
            .unwrap();
        let power_ups = PowerUps::new(CardRegistry::default());

        let mut event = ChargeEvent {
            card: CARD.to_string(),
            card_type: CardType::ChargeLife,
            charging: game.find_robot_with_identifier("r2").unwrap().summary(),
            remaining: 3,
            full: false,
            depleted: false,
        };
        event.charging.life = 6;

        // Unknown card: created full, remaining is not applied
        assert!(power_ups.apply_remote_charge(&mut game, &event, 2_000));
        assert_eq!(charges(&mut game), 5);
        assert_eq!(game.find_card(CARD).unwrap().timestamp, 2_000);
        assert_eq!(game.find_robot_with_identifier("r2").unwrap().life, 6);

        // Known card follows the remote count
        assert!(power_ups.apply_remote_charge(&mut game, &event, 3_000));
        assert_eq!(charges(&mut game), 3);
        assert_eq!(game.find_card(CARD).unwrap().timestamp, 3_000);
    }

    #[test]
    fn test_apply_remote_charge_unknown_robot() {
        let mut game = game_with_life(10);
        let power_ups = PowerUps::new(CardRegistry::default());
        let event = ChargeEvent {
            card: CARD.to_string(),
            card_type: CardType::ChargeLife,
            charging: Robot::new_remote("ghost", "10.0.0.8".parse().unwrap()).summary(),
            remaining: 1,
            full: false,
            depleted: false,
        };
        assert!(!power_ups.apply_remote_charge(&mut game, &event, 1_000));
        assert!(game.find_card(CARD).is_some());
    }
}
