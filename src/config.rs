// 7.0 config.rs: the charge schedule. every rate and cap the formulas read lives here.
// 7.1 rates are fractions of turnover (0.001 = 0.1%), flats are currency units.
// 7.2 from_env overlays CHARGES_* variables on top of the defaults.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::commodity::CommodityGroup;
use crate::engine::PayoutSettings;
use crate::types::ChargeKey;

/// Rates for one (segment, sub-segment) formula. Which fields a formula reads
/// depends on the formula; unused fields stay zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    // Brokerage as a fraction of turnover (turnover-based formulas only)
    pub brokerage_rate: Decimal,
    // Flat brokerage, or the cap when brokerage is turnover-based
    pub brokerage_flat: Decimal,
    // STT/CTT as a fraction of turnover
    pub stt_rate: Decimal,
    // STT/CTT as a fixed amount (currency formulas)
    pub stt_flat: Decimal,
    // NSE transaction rate, or the sole rate when there is no exchange split
    pub transaction_rate: Decimal,
    pub transaction_rate_bse: Decimal,
    pub sebi_rate: Decimal,
    pub stamp_rate: Decimal,
}

impl RateCard {
    fn zero() -> Self {
        Self {
            brokerage_rate: Decimal::ZERO,
            brokerage_flat: Decimal::ZERO,
            stt_rate: Decimal::ZERO,
            stt_flat: Decimal::ZERO,
            transaction_rate: Decimal::ZERO,
            transaction_rate_bse: Decimal::ZERO,
            sebi_rate: Decimal::ZERO,
            stamp_rate: Decimal::ZERO,
        }
    }
}

/// Commodity futures transaction rates, one per MCX contract group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityTransactionRates {
    pub normal: Decimal,
    pub castorseed: Decimal,
    pub kapas: Decimal,
    pub pepper: Decimal,
    pub rbdpmolein: Decimal,
}

impl CommodityTransactionRates {
    pub fn rate_for(&self, group: CommodityGroup) -> Decimal {
        match group {
            CommodityGroup::Normal => self.normal,
            CommodityGroup::Castorseed => self.castorseed,
            CommodityGroup::Kapas => self.kapas,
            CommodityGroup::Pepper => self.pepper,
            CommodityGroup::Rbdpmolein => self.rbdpmolein,
        }
    }
}

/// Margin trading facility brokerage. Everything except brokerage follows delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtfRates {
    pub brokerage_rate: Decimal,
    pub brokerage_cap: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSchedule {
    pub gst_rate: Decimal,
    pub equity_delivery: RateCard,
    pub equity_intraday: RateCard,
    pub equity_futures: RateCard,
    pub equity_options: RateCard,
    pub currency_futures: RateCard,
    pub currency_options: RateCard,
    pub commodity_futures: RateCard,
    pub commodity_options: RateCard,
    pub commodity_groups: CommodityTransactionRates,
    // replaces commodity_futures.sebi_rate for agri contracts
    pub commodity_agri_sebi_rate: Decimal,
    pub mtf: MtfRates,
}

impl Default for ChargeSchedule {
    fn default() -> Self {
        let sebi = dec!(0.000001); // Rs 10 per crore

        Self {
            gst_rate: dec!(0.18),
            equity_delivery: RateCard {
                stt_rate: dec!(0.001),
                transaction_rate: dec!(0.0000297),
                transaction_rate_bse: dec!(0.0000375),
                sebi_rate: sebi,
                stamp_rate: dec!(0.00015),
                ..RateCard::zero()
            },
            equity_intraday: RateCard {
                brokerage_rate: dec!(0.0003),
                brokerage_flat: dec!(20),
                stt_rate: dec!(0.00025),
                transaction_rate: dec!(0.0000297),
                transaction_rate_bse: dec!(0.0000375),
                sebi_rate: sebi,
                stamp_rate: dec!(0.00003),
                ..RateCard::zero()
            },
            equity_futures: RateCard {
                brokerage_rate: dec!(0.0003),
                brokerage_flat: dec!(20),
                stt_rate: dec!(0.0002),
                transaction_rate: dec!(0.0000173),
                sebi_rate: sebi,
                stamp_rate: dec!(0.00002),
                ..RateCard::zero()
            },
            equity_options: RateCard {
                brokerage_flat: dec!(20),
                stt_rate: dec!(0.001),
                transaction_rate: dec!(0.0003503),
                sebi_rate: sebi,
                stamp_rate: dec!(0.00003),
                ..RateCard::zero()
            },
            currency_futures: RateCard {
                brokerage_rate: dec!(0.0003),
                brokerage_flat: dec!(20),
                transaction_rate: dec!(0.0000035),
                transaction_rate_bse: dec!(0.0000045),
                sebi_rate: sebi,
                stamp_rate: dec!(0.000001),
                ..RateCard::zero()
            },
            currency_options: RateCard {
                brokerage_flat: dec!(20),
                transaction_rate: dec!(0.000311),
                transaction_rate_bse: dec!(0.00001),
                sebi_rate: sebi,
                stamp_rate: dec!(0.000001),
                ..RateCard::zero()
            },
            commodity_futures: RateCard {
                brokerage_rate: dec!(0.0003),
                brokerage_flat: dec!(20),
                stt_rate: dec!(0.0001),
                sebi_rate: sebi,
                stamp_rate: dec!(0.00002),
                ..RateCard::zero()
            },
            commodity_options: RateCard {
                brokerage_flat: dec!(20),
                stt_rate: dec!(0.0005),
                transaction_rate: dec!(0.000418),
                sebi_rate: sebi,
                stamp_rate: dec!(0.00003),
                ..RateCard::zero()
            },
            commodity_groups: CommodityTransactionRates {
                normal: dec!(0.000021),
                castorseed: dec!(0.000005),
                kapas: dec!(0.000005),
                pepper: dec!(0.0000005),
                rbdpmolein: dec!(0.00001),
            },
            commodity_agri_sebi_rate: dec!(0.0000001), // Rs 1 per crore
            mtf: MtfRates {
                brokerage_rate: dec!(0.003),
                brokerage_cap: dec!(20),
            },
        }
    }
}

impl ChargeSchedule {
    pub fn rate_card(&self, key: ChargeKey) -> &RateCard {
        match key {
            ChargeKey::EquityDelivery => &self.equity_delivery,
            ChargeKey::EquityIntraday => &self.equity_intraday,
            ChargeKey::EquityFutures => &self.equity_futures,
            ChargeKey::EquityOptions => &self.equity_options,
            ChargeKey::CurrencyFutures => &self.currency_futures,
            ChargeKey::CurrencyOptions => &self.currency_options,
            ChargeKey::CommodityFutures => &self.commodity_futures,
            ChargeKey::CommodityOptions => &self.commodity_options,
        }
    }

    // statutory charges only, for UAT accounts
    pub fn zero_brokerage() -> Self {
        let mut schedule = Self::default();
        for (_, card) in schedule.cards_mut() {
            card.brokerage_rate = Decimal::ZERO;
            card.brokerage_flat = Decimal::ZERO;
        }
        schedule.mtf.brokerage_rate = Decimal::ZERO;
        schedule.mtf.brokerage_cap = Decimal::ZERO;
        schedule
    }

    fn cards(&self) -> [(&'static str, &RateCard); 8] {
        [
            ("EQUITY_DELIVERY", &self.equity_delivery),
            ("EQUITY_INTRADAY", &self.equity_intraday),
            ("EQUITY_FUTURES", &self.equity_futures),
            ("EQUITY_OPTIONS", &self.equity_options),
            ("CURRENCY_FUTURES", &self.currency_futures),
            ("CURRENCY_OPTIONS", &self.currency_options),
            ("COMMODITY_FUTURES", &self.commodity_futures),
            ("COMMODITY_OPTIONS", &self.commodity_options),
        ]
    }

    fn cards_mut(&mut self) -> [(&'static str, &mut RateCard); 8] {
        [
            ("EQUITY_DELIVERY", &mut self.equity_delivery),
            ("EQUITY_INTRADAY", &mut self.equity_intraday),
            ("EQUITY_FUTURES", &mut self.equity_futures),
            ("EQUITY_OPTIONS", &mut self.equity_options),
            ("CURRENCY_FUTURES", &mut self.currency_futures),
            ("CURRENCY_OPTIONS", &mut self.currency_options),
            ("COMMODITY_FUTURES", &mut self.commodity_futures),
            ("COMMODITY_OPTIONS", &mut self.commodity_options),
        ]
    }

    /// Load `.env` (if present) and overlay `CHARGES_*` variables on the defaults,
    /// e.g. `CHARGES_GST_RATE`, `CHARGES_EQUITY_INTRADAY_BROKERAGE_RATE`,
    /// `CHARGES_COMMODITY_GROUP_PEPPER`, `CHARGES_MTF_BROKERAGE_CAP`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut schedule = Self::default();
        override_decimal("CHARGES_GST_RATE", &mut schedule.gst_rate)?;

        for (name, card) in schedule.cards_mut() {
            let prefix = format!("CHARGES_{name}");
            override_decimal(&format!("{prefix}_BROKERAGE_RATE"), &mut card.brokerage_rate)?;
            override_decimal(&format!("{prefix}_BROKERAGE_FLAT"), &mut card.brokerage_flat)?;
            override_decimal(&format!("{prefix}_STT_RATE"), &mut card.stt_rate)?;
            override_decimal(&format!("{prefix}_STT_FLAT"), &mut card.stt_flat)?;
            override_decimal(&format!("{prefix}_TRANSACTION_RATE"), &mut card.transaction_rate)?;
            override_decimal(&format!("{prefix}_TRANSACTION_RATE_BSE"), &mut card.transaction_rate_bse)?;
            override_decimal(&format!("{prefix}_SEBI_RATE"), &mut card.sebi_rate)?;
            override_decimal(&format!("{prefix}_STAMP_RATE"), &mut card.stamp_rate)?;
        }

        let groups = &mut schedule.commodity_groups;
        override_decimal("CHARGES_COMMODITY_GROUP_NORMAL", &mut groups.normal)?;
        override_decimal("CHARGES_COMMODITY_GROUP_CASTORSEED", &mut groups.castorseed)?;
        override_decimal("CHARGES_COMMODITY_GROUP_KAPAS", &mut groups.kapas)?;
        override_decimal("CHARGES_COMMODITY_GROUP_PEPPER", &mut groups.pepper)?;
        override_decimal("CHARGES_COMMODITY_GROUP_RBDPMOLEIN", &mut groups.rbdpmolein)?;
        override_decimal("CHARGES_COMMODITY_AGRI_SEBI_RATE", &mut schedule.commodity_agri_sebi_rate)?;
        override_decimal("CHARGES_MTF_BROKERAGE_RATE", &mut schedule.mtf.brokerage_rate)?;
        override_decimal("CHARGES_MTF_BROKERAGE_CAP", &mut schedule.mtf.brokerage_cap)?;

        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("gst_rate", self.gst_rate)?;

        for (name, card) in self.cards() {
            let rates = [
                ("brokerage_rate", card.brokerage_rate),
                ("stt_rate", card.stt_rate),
                ("transaction_rate", card.transaction_rate),
                ("transaction_rate_bse", card.transaction_rate_bse),
                ("sebi_rate", card.sebi_rate),
                ("stamp_rate", card.stamp_rate),
            ];
            for (field, value) in rates {
                check_rate(&format!("{name}.{field}"), value)?;
            }
            check_amount(&format!("{name}.brokerage_flat"), card.brokerage_flat)?;
            check_amount(&format!("{name}.stt_flat"), card.stt_flat)?;
        }

        let groups = &self.commodity_groups;
        for (field, value) in [
            ("normal", groups.normal),
            ("castorseed", groups.castorseed),
            ("kapas", groups.kapas),
            ("pepper", groups.pepper),
            ("rbdpmolein", groups.rbdpmolein),
        ] {
            check_rate(&format!("commodity_groups.{field}"), value)?;
        }
        check_rate("commodity_agri_sebi_rate", self.commodity_agri_sebi_rate)?;
        check_rate("mtf.brokerage_rate", self.mtf.brokerage_rate)?;
        check_amount("mtf.brokerage_cap", self.mtf.brokerage_cap)?;

        Ok(())
    }
}

fn check_rate(field: &str, value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO || value >= Decimal::ONE {
        return Err(ConfigError::InvalidRate {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_amount(field: &str, value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO {
        return Err(ConfigError::InvalidAmount {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

pub(crate) fn override_decimal(key: &str, target: &mut Decimal) -> Result<(), ConfigError> {
    if let Ok(raw) = env::var(key) {
        *target = Decimal::from_str(raw.trim()).map_err(|_| ConfigError::Unparsable {
            key: key.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("rate {field} must be in [0, 1), got {value}")]
    InvalidRate { field: String, value: Decimal },

    #[error("amount {field} must not be negative, got {value}")]
    InvalidAmount { field: String, value: Decimal },

    #[error("environment variable {key} has unparsable value {value:?}")]
    Unparsable { key: String, value: String },

    #[error("invalid payout setting: {reason}")]
    InvalidPayout { reason: String },
}

/// Everything the engine needs at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub charges: ChargeSchedule,
    pub payout: PayoutSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            charges: ChargeSchedule::from_env()?,
            payout: PayoutSettings::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.charges.validate()?;
        self.payout.validate()
    }
}

// Deployment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Uat,
    Production,
}

impl Environment {
    pub fn settings(&self) -> Settings {
        match self {
            Environment::Development => Settings::default(),
            Environment::Uat => Settings {
                charges: ChargeSchedule::zero_brokerage(),
                payout: PayoutSettings {
                    cutoff_hour: 23,
                    queue_key_prefix: "uat_payout_queue".to_string(),
                    ..PayoutSettings::default()
                },
            },
            Environment::Production => Settings {
                charges: ChargeSchedule::default(),
                payout: PayoutSettings {
                    cutoff_hour: 14,
                    ..PayoutSettings::default()
                },
            },
        }
    }
}
