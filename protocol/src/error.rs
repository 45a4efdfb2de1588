//! # Error Taxonomy
//!
//! One enum for the whole engine. Every variant aborts the enclosing request;
//! nothing in this crate retries or recovers locally. The host maps
//! [`FtError::code`] onto whatever diagnostic surface it exposes.

use thiserror::Error;

use crate::storage::StoreError;
use crate::types::{Amount, Feature};

/// Errors surfaced by the fungible-token engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FtError {
    /// Denom, definition, or settings absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed symbol or subunit, out-of-range rate, bad feature combination.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation needs a feature the denom does not have.
    #[error("feature {feature} is disabled for {denom}")]
    FeatureDisabled {
        /// Denom the operation targeted.
        denom: String,
        /// The missing feature.
        feature: Feature,
    },

    /// Caller lacks issuer, admin, or governance privilege.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Spendable-minus-locks check failed, or a feature balance would go
    /// below zero.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Receipt would push the account past its whitelisted limit.
    #[error(
        "whitelisted limit exceeded for {account}: balance after receipt {after}{denom}, limit {limit}{denom}"
    )]
    WhitelistedLimitExceeded {
        /// Receiving account.
        account: String,
        /// Denom being received.
        denom: String,
        /// Balance the account would end up with.
        after: Amount,
        /// The whitelisted ceiling.
        limit: Amount,
    },

    /// The denom is globally frozen.
    #[error("{0} is globally frozen")]
    GloballyFrozen(String),

    /// DEX-aware spendable balance is too small to reserve the amount.
    #[error("insufficient DEX spendable balance: {0}")]
    InsufficientSpendableBalance(String),

    /// The delegated extension contract rejected the call or misbehaved.
    #[error("extension call failed: {0}")]
    ExtensionCallFailed(String),

    /// Internal consistency failure. Always fatal to the request.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

pub type FtResult<T> = Result<T, FtError>;

impl FtError {
    /// Stable, snake_case kind name for client diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            FtError::NotFound(_) => "not_found",
            FtError::InvalidInput(_) => "invalid_input",
            FtError::FeatureDisabled { .. } => "feature_disabled",
            FtError::Unauthorized(_) => "unauthorized",
            FtError::InsufficientFunds(_) => "insufficient_funds",
            FtError::WhitelistedLimitExceeded { .. } => "whitelisted_limit_exceeded",
            FtError::GloballyFrozen(_) => "globally_frozen",
            FtError::InsufficientSpendableBalance(_) => "insufficient_spendable_balance",
            FtError::ExtensionCallFailed(_) => "extension_call_failed",
            FtError::InvalidState(_) => "invalid_state",
        }
    }
}

impl From<StoreError> for FtError {
    fn from(e: StoreError) -> Self {
        FtError::InvalidState(e.to_string())
    }
}
