//! Error types and input validation

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::core::combination::BetType;
use crate::models::COURSES;

/// Smallest manual score adjustment a user may assign
pub const MIN_ADJUSTMENT: i32 = -3;
/// Largest manual score adjustment a user may assign
pub const MAX_ADJUSTMENT: i32 = 3;

/// Library error type
#[derive(Debug, Error)]
pub enum KeibaError {
    #[error("Invalid marker: {0:?} (expected one of ◎ ○ ▲ △ ⭐ × or blank)")]
    InvalidMarker(String),

    #[error("Manual adjustment must be between -3 and 3, got {value}")]
    InvalidAdjustment { value: i32 },

    #[error("{bet_type} needs at least {required} horses, got {actual}")]
    InsufficientPoolSize {
        bet_type: BetType,
        required: usize,
        actual: usize,
    },

    #[error("{bet_type} pool is limited to {max} horses, got {actual}")]
    PoolTooLarge {
        bet_type: BetType,
        max: usize,
        actual: usize,
    },

    #[error("Horse appears more than once in pool: {0}")]
    DuplicateHorse(String),

    #[error("Budget must be non-negative, got {0}")]
    NegativeBudget(i64),

    #[error("Stake must be non-negative, got {0}")]
    NegativeStake(i64),

    #[error("Total stake exceeds the representable amount")]
    StakeOverflow,

    #[error("Unknown bet type: {0}")]
    UnknownBetType(String),

    #[error("Unknown sort order: {0}")]
    UnknownSortOrder(String),

    #[error("Combination not in current allocation: {0}")]
    UnknownCombination(String),

    #[error("Horse not on race card: {0}")]
    UnknownHorse(String),

    #[error("Invalid race key: {0}")]
    InvalidRaceKey(String),

    #[error("Race not found: {0}")]
    RaceNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid configuration value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },

    #[error("Invalid race data: {0}")]
    InvalidData(String),

    #[error("Failed to load race data: {0}")]
    DataLoad(#[from] PolarsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, KeibaError>;

impl KeibaError {
    /// Machine-readable error code used in API responses
    pub fn code(&self) -> &'static str {
        match self {
            KeibaError::InvalidMarker(_) => "invalid_marker",
            KeibaError::InvalidAdjustment { .. } => "invalid_adjustment",
            KeibaError::InsufficientPoolSize { .. } => "insufficient_pool_size",
            KeibaError::PoolTooLarge { .. } => "pool_too_large",
            KeibaError::DuplicateHorse(_) => "duplicate_horse",
            KeibaError::NegativeBudget(_) => "negative_budget",
            KeibaError::NegativeStake(_) => "negative_stake",
            KeibaError::StakeOverflow => "stake_overflow",
            KeibaError::UnknownBetType(_) => "unknown_bet_type",
            KeibaError::UnknownSortOrder(_) => "unknown_sort_order",
            KeibaError::UnknownCombination(_) => "unknown_combination",
            KeibaError::UnknownHorse(_) => "unknown_horse",
            KeibaError::InvalidRaceKey(_) => "invalid_race_key",
            KeibaError::RaceNotFound(_) => "race_not_found",
            KeibaError::SessionNotFound(_) => "session_not_found",
            KeibaError::InvalidConfig { .. } => "invalid_config",
            KeibaError::InvalidData(_) => "invalid_data",
            KeibaError::DataLoad(_) => "data_load_error",
            KeibaError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(feature = "api")]
mod response {
    use actix_web::{http::StatusCode, HttpResponse, ResponseError};

    use super::KeibaError;
    use crate::models::ErrorResponse;

    impl ResponseError for KeibaError {
        fn status_code(&self) -> StatusCode {
            match self {
                KeibaError::SessionNotFound(_)
                | KeibaError::UnknownHorse(_)
                | KeibaError::RaceNotFound(_) => StatusCode::NOT_FOUND,
                KeibaError::DataLoad(_)
                | KeibaError::InvalidData(_)
                | KeibaError::InvalidConfig { .. }
                | KeibaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            }
        }

        fn error_response(&self) -> HttpResponse {
            HttpResponse::build(self.status_code()).json(ErrorResponse {
                error: self.code().to_string(),
                message: self.to_string(),
            })
        }
    }
}

/// Validation functions
pub fn validate_adjustment(value: i32) -> Result<()> {
    if !(MIN_ADJUSTMENT..=MAX_ADJUSTMENT).contains(&value) {
        return Err(KeibaError::InvalidAdjustment { value });
    }
    Ok(())
}

pub fn validate_budget(budget: i64) -> Result<()> {
    if budget < 0 {
        return Err(KeibaError::NegativeBudget(budget));
    }
    Ok(())
}

pub fn validate_stake(stake: i64) -> Result<()> {
    if stake < 0 {
        return Err(KeibaError::NegativeStake(stake));
    }
    Ok(())
}

pub fn validate_race_no(race_no: u8) -> Result<()> {
    if !(1..=12).contains(&race_no) {
        return Err(KeibaError::InvalidRaceKey(format!(
            "Race number must be between 1 and 12, got {}",
            race_no
        )));
    }
    Ok(())
}

pub fn validate_course(course: &str) -> Result<()> {
    if !COURSES.contains(&course) {
        return Err(KeibaError::InvalidRaceKey(format!(
            "Unknown course: {}",
            course
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_adjustment_valid() {
        for v in -3..=3 {
            assert!(validate_adjustment(v).is_ok());
        }
    }

    #[test]
    fn test_validate_adjustment_invalid() {
        assert!(matches!(
            validate_adjustment(4),
            Err(KeibaError::InvalidAdjustment { value: 4 })
        ));
        assert!(validate_adjustment(-4).is_err());
    }

    #[test]
    fn test_validate_budget_and_stake() {
        assert!(validate_budget(0).is_ok());
        assert!(validate_budget(1000).is_ok());
        assert!(matches!(validate_budget(-1), Err(KeibaError::NegativeBudget(-1))));
        assert!(validate_stake(0).is_ok());
        assert!(matches!(validate_stake(-50), Err(KeibaError::NegativeStake(-50))));
    }

    #[test]
    fn test_validate_race_no() {
        assert!(validate_race_no(1).is_ok());
        assert!(validate_race_no(12).is_ok());
        assert!(validate_race_no(0).is_err());
        assert!(validate_race_no(13).is_err());
    }

    #[test]
    fn test_validate_course() {
        assert!(validate_course("東京").is_ok());
        assert!(validate_course("小倉").is_ok());
        assert!(validate_course("大井").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = KeibaError::InsufficientPoolSize {
            bet_type: BetType::Trio,
            required: 3,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("at least 3"));
        assert!(msg.contains("got 2"));
        assert_eq!(err.code(), "insufficient_pool_size");
    }

    #[cfg(feature = "api")]
    #[test]
    fn test_error_status_codes() {
        use actix_web::{http::StatusCode, ResponseError};

        assert_eq!(
            KeibaError::InvalidAdjustment { value: 9 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            KeibaError::StakeOverflow.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            KeibaError::SessionNotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            KeibaError::Internal("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
