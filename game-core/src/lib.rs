//! Coupon ledger, reward status rules and the mini-game engines behind the
//! anniversary gift site.

pub mod catalog;
pub mod games;
pub mod ledger;
pub mod presentation;
pub mod scheduler;
pub mod status;

pub use catalog::{Catalog, CatalogError, RewardDefinition, RewardId};
pub use games::{apply_action, Game, GameAction, GameError, GameEvent, GameKind, GameView, Outcome};
pub use ledger::{FileStore, Ledger, LedgerState, LedgerStore, MemoryStore, StoreError};
pub use presentation::{card_for, group_rewards, RewardCard, RewardGroups};
pub use scheduler::{Scheduler, TimerHandle};
pub use status::{
    resolve_status, Clock, FixedClock, RewardStatus, StatusOverrides, StatusResolver, SystemClock,
};
