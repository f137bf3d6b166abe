use std::result::Result as StdResult;

use thiserror::Error;

/// Errors raised when parsing domain values from their stored form.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid observation type: {0}")]
    InvalidObservationType(String),

    #[error("invalid session status: {0}")]
    InvalidSessionStatus(String),

    #[error("invalid sort order: {0}")]
    InvalidSortOrder(String),
}

pub type Result<T> = StdResult<T, CoreError>;
