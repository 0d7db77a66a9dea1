use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::catalog::RewardDefinition;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Pending,
    Available,
    Expired,
}

impl fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RewardStatus::Pending => "pending",
            RewardStatus::Available => "available",
            RewardStatus::Expired => "expired",
        })
    }
}

impl FromStr for RewardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RewardStatus::Pending),
            "available" => Ok(RewardStatus::Available),
            "expired" => Ok(RewardStatus::Expired),
            other => Err(format!("unknown reward status `{other}`")),
        }
    }
}

/// Maps a date onto a reward window. Both ends of the window are inclusive.
pub fn resolve_status(today: NaiveDate, unlock: NaiveDate, expiry: NaiveDate) -> RewardStatus {
    if today < unlock {
        RewardStatus::Pending
    } else if today > expiry {
        RewardStatus::Expired
    } else {
        RewardStatus::Available
    }
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Operator overrides for demos; `None` leaves real data in charge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusOverrides {
    pub status: Option<RewardStatus>,
    pub won: Option<bool>,
}

#[derive(Clone)]
pub struct StatusResolver {
    clock: Arc<dyn Clock>,
    overrides: StatusOverrides,
}

impl Default for StatusResolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), StatusOverrides::default())
    }
}

impl StatusResolver {
    pub fn new(clock: Arc<dyn Clock>, overrides: StatusOverrides) -> Self {
        Self { clock, overrides }
    }

    pub fn fixed(today: NaiveDate) -> Self {
        Self::new(Arc::new(FixedClock(today)), StatusOverrides::default())
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn status_of(&self, reward: &RewardDefinition) -> RewardStatus {
        self.overrides
            .status
            .unwrap_or_else(|| resolve_status(self.today(), reward.unlock_date, reward.expiry_date))
    }

    pub fn won(&self, recorded: bool) -> bool {
        self.overrides.won.unwrap_or(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::GameKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let unlock = date(2025, 1, 1);
        let expiry = date(2025, 1, 31);

        assert_eq!(resolve_status(unlock, unlock, expiry), RewardStatus::Available);
        assert_eq!(resolve_status(expiry, unlock, expiry), RewardStatus::Available);
        assert_eq!(
            resolve_status(expiry.succ_opt().unwrap(), unlock, expiry),
            RewardStatus::Expired
        );
        assert_eq!(
            resolve_status(unlock.pred_opt().unwrap(), unlock, expiry),
            RewardStatus::Pending
        );
        assert_eq!(resolve_status(date(2025, 1, 15), unlock, expiry), RewardStatus::Available);
    }

    #[test]
    fn overrides_win_over_clock_and_ledger() {
        let reward = RewardDefinition {
            id: 1,
            name: "Un beso".into(),
            description: String::new(),
            unlock_date: date(2025, 1, 1),
            expiry_date: date(2025, 1, 31),
            points: 100,
            game: GameKind::Kiss,
        };

        let plain = StatusResolver::fixed(date(2025, 3, 1));
        assert_eq!(plain.status_of(&reward), RewardStatus::Expired);
        assert!(!plain.won(false));

        let forced = StatusResolver::new(
            Arc::new(FixedClock(date(2025, 3, 1))),
            StatusOverrides {
                status: Some(RewardStatus::Available),
                won: Some(true),
            },
        );
        assert_eq!(forced.status_of(&reward), RewardStatus::Available);
        assert!(forced.won(false));
    }

    #[test]
    fn parses_status_names() {
        assert_eq!("Expired".parse::<RewardStatus>(), Ok(RewardStatus::Expired));
        assert_eq!(" pending ".parse::<RewardStatus>(), Ok(RewardStatus::Pending));
        assert!("soon".parse::<RewardStatus>().is_err());
    }
}
