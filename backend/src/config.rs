use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anniversary_core::{
    Catalog, CatalogError, Clock, FixedClock, RewardStatus, StatusOverrides, StatusResolver,
    SystemClock,
};
use chrono::NaiveDate;
use clap::Parser;
use thiserror::Error;

/// Every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "anniversary-backend", about = "Anniversary coupons and mini-games server")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Directory holding the ledger file.
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Gate passphrase, compared case-insensitively.
    #[arg(long, env = "PASSPHRASE", default_value = "teamo")]
    pub passphrase: String,

    /// Phone number the claim endpoint redirects to.
    #[arg(long, env = "WHATSAPP_PHONE")]
    pub whatsapp_phone: Option<String>,

    /// JSON catalog replacing the built-in coupons.
    #[arg(long = "catalog", env = "CATALOG_PATH")]
    pub catalog_path: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD).
    #[arg(long, env = "FORCE_DATE")]
    pub force_date: Option<NaiveDate>,

    /// Force every coupon to pending, available or expired.
    #[arg(long, env = "FORCE_STATUS")]
    pub force_status: Option<RewardStatus>,

    /// Force every coupon's won flag.
    #[arg(long, env = "FORCE_WON")]
    pub force_won: Option<bool>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("reading catalog {}: {source}", path.display())]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Runtime knobs the handlers need.
#[derive(Debug, Clone)]
pub struct Settings {
    pub passphrase: String,
    pub whatsapp_phone: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            passphrase: "teamo".to_string(),
            whatsapp_phone: None,
        }
    }
}

impl Config {
    pub fn settings(&self) -> Settings {
        Settings {
            passphrase: self.passphrase.clone(),
            whatsapp_phone: self
                .whatsapp_phone
                .as_deref()
                .map(str::trim)
                .filter(|phone| !phone.is_empty())
                .map(str::to_string),
        }
    }

    pub fn catalog(&self) -> Result<Catalog, StartupError> {
        let Some(path) = &self.catalog_path else {
            return Ok(Catalog::builtin());
        };
        let json = std::fs::read_to_string(path).map_err(|source| StartupError::CatalogRead {
            path: path.clone(),
            source,
        })?;
        Ok(Catalog::from_json(&json)?)
    }

    pub fn resolver(&self) -> StatusResolver {
        let clock: Arc<dyn Clock> = match self.force_date {
            Some(date) => Arc::new(FixedClock(date)),
            None => Arc::new(SystemClock),
        };
        StatusResolver::new(
            clock,
            StatusOverrides {
                status: self.force_status,
                won: self.force_won,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_overrides() {
        let config = Config::parse_from([
            "anniversary-backend",
            "--bind",
            "127.0.0.1:8080",
            "--force-date",
            "2024-06-15",
            "--force-status",
            "expired",
            "--force-won",
            "true",
            "--whatsapp-phone",
            " 5491112345678 ",
        ]);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.force_date, Some(date(2024, 6, 15)));
        assert_eq!(config.force_status, Some(RewardStatus::Expired));
        assert_eq!(config.force_won, Some(true));
        assert_eq!(config.settings().whatsapp_phone.as_deref(), Some("5491112345678"));

        let resolver = config.resolver();
        assert_eq!(resolver.today(), date(2024, 6, 15));
        let catalog = Catalog::builtin();
        let reward = &catalog.rewards()[0];
        assert_eq!(resolver.status_of(reward), RewardStatus::Expired);
        assert!(resolver.won(false));
    }

    #[test]
    fn rejects_unknown_status() {
        let err = Config::try_parse_from(["anniversary-backend", "--force-status", "claimed"]);
        assert!(err.is_err());
    }

    #[test]
    fn blank_phone_counts_as_unset() {
        let config = Config::parse_from(["anniversary-backend", "--whatsapp-phone", "  "]);
        assert_eq!(config.settings().whatsapp_phone, None);
    }

    #[test]
    fn loads_catalog_file_and_reports_bad_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":1,"name":"Beso","description":"","unlock_date":"2025-01-01","expiry_date":"2025-01-31","points":100,"game":"kiss-game"}}]"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = Config::parse_from(["anniversary-backend", "--catalog", path]);
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.rewards().len(), 1);

        let missing = Config::parse_from(["anniversary-backend", "--catalog", "/nonexistent/catalog.json"]);
        assert!(matches!(missing.catalog(), Err(StartupError::CatalogRead { .. })));
    }
}
