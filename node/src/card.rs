//! Power-up cards
//!
//! A card is a physical RFID tag placed on the arena floor. Its behavior is
//! a tagged variant ([`CardKind`]) built through the [`CardRegistry`], which
//! maps every [`CardType`] to a constructor.

use crate::config::CardConfig;
use shared::CardType;
use std::collections::HashMap;

/// Card that hands charge units over to the robot standing on it, and
/// slowly refills itself while nobody uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recharger {
    charges: u32,
    /// When the last self refill happened, 0 if none is pending
    previous_refill: u64,
    config: CardConfig,
}

impl Recharger {
    pub fn new(config: CardConfig) -> Self {
        Self {
            charges: 0,
            previous_refill: 0,
            config,
        }
    }

    pub fn charges(&self) -> u32 {
        self.charges
    }

    /// Clamped to the card capacity.
    pub fn set_charges(&mut self, charges: u32) {
        self.charges = charges.min(self.config.max_charges);
    }

    pub fn max_charges(&self) -> u32 {
        self.config.max_charges
    }

    pub fn is_depleted(&self) -> bool {
        self.charges == 0
    }

    /// Takes one charge unit out of the card, false if it was empty
    pub fn take_charge(&mut self) -> bool {
        if self.charges == 0 {
            return false;
        }
        self.charges -= 1;
        true
    }

    fn reset(&mut self) {
        self.charges = self.config.max_charges;
        self.previous_refill = 0;
    }

    fn update(&mut self, last_used: u64, now: u64) {
        let refill_interval = self.config.self_refill_interval_ms;
        // A card in use does not refill
        if last_used > 0 && now.saturating_sub(last_used) < refill_interval {
            self.previous_refill = 0;
            return;
        }

        if self.charges < self.config.max_charges
            && now.saturating_sub(self.previous_refill) > refill_interval
        {
            self.charges += 1;
            self.previous_refill = now;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardKind {
    Recharger(Recharger),
}

impl CardKind {
    pub fn card_type(&self) -> CardType {
        match self {
            CardKind::Recharger(_) => CardType::ChargeLife,
        }
    }

    fn reset(&mut self) {
        match self {
            CardKind::Recharger(r) => r.reset(),
        }
    }

    fn update(&mut self, last_used: u64, now: u64) {
        match self {
            CardKind::Recharger(r) => r.update(last_used, now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    id: String,
    /// Last time a robot was detected over this card, 0 if never
    pub timestamp: u64,
    kind: CardKind,
}

impl Card {
    pub fn new(id: &str, kind: CardKind) -> Self {
        Self {
            id: id.to_string(),
            timestamp: 0,
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn card_type(&self) -> CardType {
        self.kind.card_type()
    }

    pub fn kind(&self) -> &CardKind {
        &self.kind
    }

    pub fn as_recharger_mut(&mut self) -> Option<&mut Recharger> {
        match &mut self.kind {
            CardKind::Recharger(r) => Some(r),
        }
    }

    /// Restores the card for a new round
    pub fn reset(&mut self) {
        self.kind.reset();
        self.timestamp = 0;
    }

    /// Periodic housekeeping driven by the card management tick
    pub fn update(&mut self, now: u64) {
        self.kind.update(self.timestamp, now);
    }
}

type CardConstructor = fn(&CardConfig) -> CardKind;

fn new_recharger(config: &CardConfig) -> CardKind {
    CardKind::Recharger(Recharger::new(*config))
}

/// Maps each card type to the constructor of its behavior.
#[derive(Debug, Clone)]
pub struct CardRegistry {
    constructors: HashMap<CardType, CardConstructor>,
    default_type: CardType,
    config: CardConfig,
}

impl CardRegistry {
    pub fn new(config: CardConfig) -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
            default_type: CardType::ChargeLife,
            config,
        };
        registry.register(CardType::ChargeLife, new_recharger);
        registry
    }

    pub fn register(&mut self, card_type: CardType, constructor: CardConstructor) {
        self.constructors.insert(card_type, constructor);
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Builds a fresh, reset card of the given type
    pub fn create(&self, card_type: CardType, id: &str) -> Option<Card> {
        let constructor = self.constructors.get(&card_type)?;
        let mut card = Card::new(id, constructor(&self.config));
        card.reset();
        Some(card)
    }

    /// Card for a tag never seen before. Every unknown tag is a recharger.
    pub fn create_default(&self, id: &str) -> Card {
        self.create(self.default_type, id)
            .unwrap_or_else(|| {
                let mut card = Card::new(id, new_recharger(&self.config));
                card.reset();
                card
            })
    }
}

impl Default for CardRegistry {
    fn default() -> Self {
        Self::new(CardConfig::default())
    }
}

/// Card id of an RFID tag: its uid bytes as unsigned decimals.
pub fn card_id_from_uid(uid: &[u8]) -> String {
    uid.iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recharger_card() -> Card {
        CardRegistry::default().create_default("1 2 3 4")
    }

    fn charges(card: &mut Card) -> u32 {
        card.as_recharger_mut().unwrap().charges()
    }

    #[test]
    fn test_card_id_from_uid() {
        assert_eq!(card_id_from_uid(&[4, 170, 255, 9]), "4 170 255 9");
        assert_eq!(card_id_from_uid(&[0x80]), "128");
        assert_eq!(card_id_from_uid(&[]), "");
    }

    #[test]
    fn test_fresh_recharger_is_full() {
        let mut card = recharger_card();
        assert_eq!(card.card_type(), CardType::ChargeLife);
        assert_eq!(card.timestamp, 0);
        assert_eq!(charges(&mut card), 5);
    }

    #[test]
    fn test_reset_restores_charges() {
        let mut card = recharger_card();
        card.timestamp = 12345;
        card.as_recharger_mut().unwrap().set_charges(1);
        card.reset();
        assert_eq!(card.timestamp, 0);
        assert_eq!(charges(&mut card), 5);
    }

    #[test]
    fn test_set_charges_is_clamped() {
        let mut card = recharger_card();
        card.as_recharger_mut().unwrap().set_charges(99);
        assert_eq!(charges(&mut card), 5);
    }

    #[test]
    fn test_take_charge_stops_at_zero() {
        let mut card = recharger_card();
        let recharger = card.as_recharger_mut().unwrap();
        recharger.set_charges(1);
        assert!(recharger.take_charge());
        assert!(recharger.is_depleted());
        assert!(!recharger.take_charge());
        assert_eq!(recharger.charges(), 0);
    }

    #[test]
    fn test_update_refills_idle_card() {
        let mut card = recharger_card();
        card.as_recharger_mut().unwrap().set_charges(2);

        // Never used and never refilled: the first tick refills
        card.update(100_000);
        assert_eq!(charges(&mut card), 3);

        // Refill interval must strictly elapse before the next one
        card.update(105_000);
        assert_eq!(charges(&mut card), 3);
        card.update(105_001);
        assert_eq!(charges(&mut card), 4);
    }

    #[test]
    fn test_update_suppressed_while_in_use() {
        let mut card = recharger_card();
        card.as_recharger_mut().unwrap().set_charges(2);
        card.timestamp = 100_000;

        card.update(104_999);
        assert_eq!(charges(&mut card), 2);

        // Once the card is left alone long enough, refilling resumes
        card.update(105_000);
        assert_eq!(charges(&mut card), 3);
    }

    #[test]
    fn test_update_never_exceeds_capacity() {
        let mut card = recharger_card();
        for step in 1..10u64 {
            card.update(step * 10_000);
        }
        assert_eq!(charges(&mut card), 5);
    }

    #[test]
    fn test_registry_custom_constructor() {
        fn half_charged(config: &CardConfig) -> CardKind {
            let mut recharger = Recharger::new(*config);
            recharger.set_charges(config.max_charges / 2);
            CardKind::Recharger(recharger)
        }

        let mut registry = CardRegistry::default();
        registry.register(CardType::ChargeLife, half_charged);
        // Constructors are always followed by a reset
        let mut card = registry.create(CardType::ChargeLife, "9 9").unwrap();
        assert_eq!(charges(&mut card), 5);
        assert_eq!(card.id(), "9 9");
    }

    #[test]
    fn test_registry_uses_config_capacity() {
        let config = CardConfig {
            max_charges: 3,
            ..CardConfig::default()
        };
        let registry = CardRegistry::new(config);
        let mut card = registry.create_default("7");
        assert_eq!(charges(&mut card), 3);
        assert_eq!(registry.config().max_charges, 3);
    }
}
