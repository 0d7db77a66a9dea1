use serde::Serialize;

use crate::catalog::{Catalog, RewardDefinition};
use crate::ledger::LedgerState;
use crate::status::{RewardStatus, StatusResolver};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RewardCard {
    #[serde(flatten)]
    pub reward: RewardDefinition,
    pub status: RewardStatus,
    pub won: bool,
}

/// The four sections of the coupon board. Every catalog entry lands in exactly one.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RewardGroups {
    pub active: Vec<RewardCard>,
    pub available: Vec<RewardCard>,
    pub expired: Vec<RewardCard>,
    pub pending: Vec<RewardCard>,
}

impl RewardGroups {
    pub fn len(&self) -> usize {
        self.active.len() + self.available.len() + self.expired.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn card_for(reward: &RewardDefinition, resolver: &StatusResolver, ledger: &LedgerState) -> RewardCard {
    RewardCard {
        reward: reward.clone(),
        status: resolver.status_of(reward),
        won: resolver.won(ledger.is_won(reward.id)),
    }
}

pub fn group_rewards(catalog: &Catalog, resolver: &StatusResolver, ledger: &LedgerState) -> RewardGroups {
    let mut groups = RewardGroups::default();
    for reward in catalog.rewards() {
        let card = card_for(reward, resolver, ledger);
        match (card.status, card.won) {
            (RewardStatus::Available, true) => groups.active.push(card),
            (RewardStatus::Available, false) => groups.available.push(card),
            (RewardStatus::Expired, _) => groups.expired.push(card),
            (RewardStatus::Pending, _) => groups.pending.push(card),
        }
    }

    groups
        .expired
        .sort_by(|a, b| b.reward.expiry_date.cmp(&a.reward.expiry_date));
    groups
        .pending
        .sort_by(|a, b| a.reward.unlock_date.cmp(&b.reward.unlock_date));
    groups
}
