use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{ChargeFrequency, InterestBasis};

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// slack allowed when comparing paid against scheduled amounts
    pub tolerance: Money,
    /// frequency used for overflow due dates when the parent loan cannot be read
    pub fallback_charge_frequency: ChargeFrequency,
    pub savings: SavingsConfig,
    pub sync: SyncConfig,
}

/// savings defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsConfig {
    pub default_account_name: String,
    pub default_interest_rate: Rate,
    pub default_interest_basis: InterestBasis,
}

/// sync queue behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// flush right after enqueuing while online
    pub auto_flush: bool,
}

impl LedgerConfig {
    /// configuration used by community savings groups
    pub fn natillera() -> Self {
        Self {
            tolerance: Money::CENT,
            fallback_charge_frequency: ChargeFrequency::Monthly,
            savings: SavingsConfig {
                default_account_name: "Ahorro principal".to_string(),
                default_interest_rate: Rate::from_percentage(dec!(1)),
                default_interest_basis: InterestBasis::Balance,
            },
            sync: SyncConfig { auto_flush: true },
        }
    }

    /// parse and validate a json document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.tolerance.is_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("tolerance must not be negative, got {}", self.tolerance),
            });
        }
        if self.savings.default_interest_rate.is_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "default savings rate must not be negative, got {}",
                    self.savings.default_interest_rate
                ),
            });
        }
        if self.savings.default_account_name.trim().is_empty() {
            return Err(LedgerError::InvalidConfiguration {
                message: "default savings account name is empty".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::natillera()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { auto_flush: true }
    }
}
