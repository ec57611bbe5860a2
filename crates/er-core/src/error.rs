//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

/// Errors raised by `er-core` validation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid coordinate (lat {lat}, lon {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

/// Shorthand result type for `er-core`.
pub type CoreResult<T> = Result<T, CoreError>;
