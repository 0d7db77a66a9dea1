use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::games::GameKind;

pub type RewardId = u32;

/// A redeemable coupon with its visibility window. Both window bounds are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardDefinition {
    pub id: RewardId,
    pub name: String,
    pub description: String,
    pub unlock_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub points: u32,
    pub game: GameKind,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate reward id {0}")]
    DuplicateId(RewardId),
    #[error("reward {0} unlocks after it expires")]
    InvertedWindow(RewardId),
    #[error("malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    rewards: Vec<RewardDefinition>,
}

impl Catalog {
    pub fn new(rewards: Vec<RewardDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for reward in &rewards {
            if !seen.insert(reward.id) {
                return Err(CatalogError::DuplicateId(reward.id));
            }
            if reward.unlock_date > reward.expiry_date {
                return Err(CatalogError::InvertedWindow(reward.id));
            }
        }
        Ok(Self { rewards })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let rewards: Vec<RewardDefinition> = serde_json::from_str(json)?;
        Self::new(rewards)
    }

    /// The anniversary coupons, one per mini-game.
    pub fn builtin() -> Self {
        let entries = [
            (1, "Un beso", "Canjeable por un beso apasionado", 3, 100, GameKind::Kiss),
            (2, "Una cena romántica", "Canjeable por una cena romántica a la luz de las velas", 4, 200, GameKind::Dinner),
            (3, "Un masaje", "Canjeable por un masaje relajante", 5, 150, GameKind::Massage),
            (4, "Una noche sensual", "Canjeable por una noche sensual", 6, 300, GameKind::Memory),
            (5, "Un picnic", "Canjeable por un picnic al aire libre", 7, 250, GameKind::Picnic),
            (6, "Un día en la naturaleza", "Canjeable por un día en la naturaleza", 8, 250, GameKind::Nature),
            (7, "Una tarde de juegos", "Canjeable por una tarde de juegos juntos", 9, 200, GameKind::BoardGames),
            (8, "Una sorpresa", "Canjeable por una sorpresa", 10, 200, GameKind::Mystery),
        ];

        let rewards = entries
            .into_iter()
            .filter_map(|(id, name, description, month, points, game)| {
                let unlock_date = NaiveDate::from_ymd_opt(2024, month, 1)?;
                let expiry_date = NaiveDate::from_ymd_opt(2024, month + 1, 1)?.pred_opt()?;
                Some(RewardDefinition {
                    id,
                    name: name.to_string(),
                    description: description.to_string(),
                    unlock_date,
                    expiry_date,
                    points,
                    game,
                })
            })
            .collect();

        Self { rewards }
    }

    pub fn rewards(&self) -> &[RewardDefinition] {
        &self.rewards
    }

    pub fn get(&self, id: RewardId) -> Option<&RewardDefinition> {
        self.rewards.iter().find(|r| r.id == id)
    }

    pub fn for_game(&self, game: GameKind) -> Option<&RewardDefinition> {
        self.rewards.iter().find(|r| r.game == game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reward(id: RewardId, unlock: NaiveDate, expiry: NaiveDate) -> RewardDefinition {
        RewardDefinition {
            id,
            name: format!("reward-{id}"),
            description: String::new(),
            unlock_date: unlock,
            expiry_date: expiry,
            points: 100,
            game: GameKind::Kiss,
        }
    }

    #[test]
    fn builtin_catalog_is_valid_and_complete() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.rewards().len(), 8);
        assert!(Catalog::new(catalog.rewards().to_vec()).is_ok());

        let kiss = catalog.get(1).unwrap();
        assert_eq!(kiss.unlock_date, date(2024, 3, 1));
        assert_eq!(kiss.expiry_date, date(2024, 3, 31));
        assert_eq!(catalog.get(3).unwrap().expiry_date, date(2024, 5, 31));
        assert_eq!(catalog.get(8).unwrap().expiry_date, date(2024, 10, 31));
        assert_eq!(catalog.for_game(GameKind::Memory).unwrap().id, 4);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::new(vec![
            reward(1, date(2025, 1, 1), date(2025, 1, 31)),
            reward(1, date(2025, 2, 1), date(2025, 2, 28)),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(1)));
    }

    #[test]
    fn rejects_inverted_window_but_allows_single_day() {
        let err = Catalog::new(vec![reward(2, date(2025, 2, 1), date(2025, 1, 31))]).unwrap_err();
        assert!(matches!(err, CatalogError::InvertedWindow(2)));

        assert!(Catalog::new(vec![reward(3, date(2025, 1, 1), date(2025, 1, 1))]).is_ok());
    }

    #[test]
    fn loads_catalog_from_json() {
        let json = r#"[{
            "id": 1,
            "name": "Un beso",
            "description": "x",
            "unlock_date": "2025-01-01",
            "expiry_date": "2025-01-31",
            "points": 100,
            "game": "kiss-game"
        }]"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.get(1).unwrap().game, GameKind::Kiss);

        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(CatalogError::Malformed(_))
        ));
    }
}
