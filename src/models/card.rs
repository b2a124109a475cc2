//! Card models and active-card aggregation.

use serde::{Deserialize, Serialize};

/// A single card contributing to a user's mining rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Card name
    pub name: String,
    /// Energy cost to equip
    pub energy: u32,
    /// Power contribution while active
    pub puissance: f64,
    /// Bonus contribution while active
    pub bonus: f64,
    /// Active flag (0/1)
    pub active: u8,
}

impl Card {
    pub fn is_active(&self) -> bool {
        self.active == 1
    }

    /// Default card seeded at signup so a fresh account can start mining.
    pub fn starter() -> Self {
        Self {
            name: "Starter".to_string(),
            energy: 1,
            puissance: 0.1,
            bonus: 0.0,
            active: 1,
        }
    }
}

/// Insertion-ordered card collection, stored one document per user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardCollection {
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl CardCollection {
    /// Sum of `puissance` over active cards.
    pub fn total_puissance(&self) -> f64 {
        self.cards
            .iter()
            .filter(|c| c.is_active())
            .map(|c| c.puissance)
            .sum()
    }

    /// Sum of `bonus` over active cards.
    pub fn total_bonus(&self) -> f64 {
        self.cards
            .iter()
            .filter(|c| c.is_active())
            .map(|c| c.bonus)
            .sum()
    }

    /// Number of active cards.
    pub fn active_count(&self) -> u32 {
        self.cards.iter().filter(|c| c.is_active()).count() as u32
    }

    /// Active cards in insertion order.
    pub fn active_cards(&self) -> Vec<&Card> {
        self.cards.iter().filter(|c| c.is_active()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, puissance: f64, bonus: f64, active: u8) -> Card {
        Card {
            name: name.to_string(),
            energy: 1,
            puissance,
            bonus,
            active,
        }
    }

    #[test]
    fn test_sums_only_count_active_cards() {
        let collection = CardCollection {
            cards: vec![
                card("a", 0.3, 0.1, 1),
                card("b", 0.5, 0.0, 1),
                card("c", 9.0, 9.0, 0),
            ],
        };

        assert_eq!(collection.total_puissance(), 0.8);
        assert_eq!(collection.total_bonus(), 0.1);
        assert_eq!(collection.active_count(), 2);
        assert_eq!(collection.active_cards().len(), 2);
    }

    #[test]
    fn test_empty_collection_sums_to_zero() {
        let collection = CardCollection::default();
        assert_eq!(collection.total_puissance(), 0.0);
        assert_eq!(collection.total_bonus(), 0.0);
        assert_eq!(collection.active_count(), 0);
    }
}
