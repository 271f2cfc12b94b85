//! OpenSASE Network Commerce
//!
//! Self-hosted shop combined with a referral network that pays members
//! commission on the purchases of five generations of downline.
//!
//! ## Features
//! - Session carts, checkout and order lifecycle feeding a points ledger
//! - Member directory with referral codes, sponsor chains and nine ranks
//! - Profit engine: downline traversal, points aggregation, commission math
//! - Profit periods: immutable snapshots that are calculated once and paid once

pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod events;
pub mod service;
pub mod store;

use thiserror::Error;
use crate::domain::aggregates::{CartError, OrderError, PeriodError, PeriodId};
use crate::domain::value_objects::{DateRangeError, ReferralCodeError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum NetworkError {
    /// Corrupted data: negative points, cyclic sponsor chains.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Profit period {0} is already closed")]
    AlreadyClosed(PeriodId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, NetworkError>;

impl From<PeriodError> for NetworkError {
    fn from(e: PeriodError) -> Self {
        match e { PeriodError::AlreadyClosed(id) => NetworkError::AlreadyClosed(id) }
    }
}

impl From<OrderError> for NetworkError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidTransition { .. } => NetworkError::Conflict(e.to_string()),
            OrderError::NoItems | OrderError::InvalidQuantity | OrderError::CurrencyMismatch | OrderError::AmountTooLarge => NetworkError::Validation(e.to_string()),
        }
    }
}

impl From<CartError> for NetworkError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => NetworkError::NotFound("Cart item".into()),
            _ => NetworkError::Validation(e.to_string()),
        }
    }
}

impl From<ReferralCodeError> for NetworkError {
    fn from(e: ReferralCodeError) -> Self { NetworkError::Validation(e.to_string()) }
}

impl From<DateRangeError> for NetworkError {
    fn from(e: DateRangeError) -> Self { NetworkError::Validation(e.to_string()) }
}

impl From<validator::ValidationErrors> for NetworkError {
    fn from(e: validator::ValidationErrors) -> Self { NetworkError::Validation(e.to_string()) }
}

impl From<sqlx::Error> for NetworkError {
    fn from(e: sqlx::Error) -> Self { NetworkError::StorageError(e.to_string()) }
}

impl From<serde_json::Error> for NetworkError {
    fn from(e: serde_json::Error) -> Self { NetworkError::StorageError(e.to_string()) }
}
