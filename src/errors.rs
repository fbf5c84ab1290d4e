use thiserror::Error;

use crate::decimal::{Money, Rate};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("repository error: {message}")]
    Repository {
        message: String,
    },

    #[error("sync error: {message}")]
    Sync {
        message: String,
    },

    #[error("invalid principal: {amount}")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },
}

impl LedgerError {
    pub fn repository(message: impl Into<String>) -> Self {
        LedgerError::Repository {
            message: message.into(),
        }
    }

    pub fn sync(message: impl Into<String>) -> Self {
        LedgerError::Sync {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
