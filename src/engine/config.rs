//! Payout coordinator settings.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::env;

use crate::config::{override_decimal, ConfigError};

/// Knobs for eligibility and queueing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSettings {
    /// Local hour at which new requests roll into the next day's bucket.
    pub cutoff_hour: u32,
    pub queue_key_prefix: String,
    /// Shared flag read into a `SettlementWindowPolicy`.
    pub window_flag_key: String,
    /// Flat depository charge per net-sold delivery scrip.
    pub dp_charge_per_scrip: Decimal,
    /// Share of realized cash-market profit counted towards the extra payout.
    pub cm_profit_factor: Decimal,
}

impl Default for PayoutSettings {
    fn default() -> Self {
        Self {
            cutoff_hour: 15,
            queue_key_prefix: "payout_queue".to_string(),
            window_flag_key: "payout_window_open".to_string(),
            dp_charge_per_scrip: dec!(15.93),
            cm_profit_factor: dec!(0.95),
        }
    }
}

impl PayoutSettings {
    /// Defaults overlaid with `PAYOUT_CUTOFF_HOUR`, `PAYOUT_QUEUE_KEY_PREFIX`,
    /// `PAYOUT_WINDOW_FLAG_KEY`, `PAYOUT_DP_CHARGE_PER_SCRIP` and
    /// `PAYOUT_CM_PROFIT_FACTOR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut settings = Self::default();

        if let Ok(raw) = env::var("PAYOUT_CUTOFF_HOUR") {
            settings.cutoff_hour = raw.trim().parse().map_err(|_| ConfigError::Unparsable {
                key: "PAYOUT_CUTOFF_HOUR".to_string(),
                value: raw.clone(),
            })?;
        }
        if let Ok(prefix) = env::var("PAYOUT_QUEUE_KEY_PREFIX") {
            settings.queue_key_prefix = prefix.trim().to_string();
        }
        if let Ok(key) = env::var("PAYOUT_WINDOW_FLAG_KEY") {
            settings.window_flag_key = key.trim().to_string();
        }
        override_decimal("PAYOUT_DP_CHARGE_PER_SCRIP", &mut settings.dp_charge_per_scrip)?;
        override_decimal("PAYOUT_CM_PROFIT_FACTOR", &mut settings.cm_profit_factor)?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cutoff_hour >= 24 {
            return Err(ConfigError::InvalidPayout {
                reason: format!("cutoff_hour must be below 24, got {}", self.cutoff_hour),
            });
        }
        if self.queue_key_prefix.is_empty() {
            return Err(ConfigError::InvalidPayout {
                reason: "queue_key_prefix is empty".to_string(),
            });
        }
        if self.window_flag_key.is_empty() {
            return Err(ConfigError::InvalidPayout {
                reason: "window_flag_key is empty".to_string(),
            });
        }
        if self.dp_charge_per_scrip < Decimal::ZERO {
            return Err(ConfigError::InvalidAmount {
                field: "dp_charge_per_scrip".to_string(),
                value: self.dp_charge_per_scrip,
            });
        }
        if self.cm_profit_factor < Decimal::ZERO || self.cm_profit_factor > Decimal::ONE {
            return Err(ConfigError::InvalidPayout {
                reason: format!("cm_profit_factor must be in [0, 1], got {}", self.cm_profit_factor),
            });
        }
        Ok(())
    }
}
