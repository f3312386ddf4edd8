//! Unified error type for the gateway.
//!
//! Validation, inconsistency and state-transition failures are user-visible (400-class) and are
//! surfaced as-is. Store errors propagate unchanged from `sea_orm`. Normal absence while walking a
//! parts tree is never an error: repository lookups return `Ok(None)` instead.

use thiserror::Error;
use uuid::Uuid;

/// All errors produced by the gateway core and its repository.
#[derive(Debug, Error)]
pub enum Error {
    /// Input breaks one or more field or cross-record rules; every violation is collected.
    #[error("Validation failed: {}", violations.join(", "))]
    Validation {
        /// Individual violation messages in detection order
        violations: Vec<String>,
    },

    /// An enumerated field carried a literal outside its value set.
    #[error("Unexpected enum value {value:?} for field {field}")]
    UnexpectedEnum {
        /// Wire name of the field
        field: &'static str,
        /// The offending literal
        value: String,
    },

    /// Rows that must agree on a field (cfp-id, trace-id, declared unit, certificates) do not.
    #[error("Inconsistent field {field} across CFP rows of trace {trace_id}")]
    Inconsistent {
        /// Name of the disagreeing field
        field: &'static str,
        /// Trace whose aggregate was rejected
        trace_id: Uuid,
    },

    /// A new CFP set was submitted for a trace that already has CFP rows.
    #[error("CFP already registered for trace {trace_id}")]
    DuplicateCfp {
        /// Trace that already carries CFP
        trace_id: Uuid,
    },

    /// An update referenced a CFP row that does not exist.
    #[error("CFP {cfp_id} of type {cfp_type} not found")]
    CfpNotFound {
        /// Identifier of the CFP set
        cfp_id: Uuid,
        /// Wire literal of the missing row's type
        cfp_type: String,
    },

    /// The part does not exist or belongs to another operator.
    #[error("Part not found: {trace_id}")]
    PartNotFound {
        /// Trace that was looked up
        trace_id: Uuid,
    },

    /// The part is still referenced by a live trade.
    #[error("Part {trace_id} is referenced by a trade")]
    PartInUse {
        /// Trace that is still traded
        trace_id: Uuid,
    },

    /// The trade does not exist or the caller is not a party to it.
    #[error("Trade not found: {trade_id}")]
    TradeNotFound {
        /// Trade that was looked up
        trade_id: Uuid,
    },

    /// The request status bound to a trade is missing.
    #[error("Request status not found for trade {trade_id}")]
    StatusNotFound {
        /// Trade whose status is missing
        trade_id: Uuid,
    },

    /// The request status is not in a state that accepts the event.
    #[error("Cannot {event} a request in status {from}")]
    InvalidTransition {
        /// Current status literal
        from: String,
        /// Attempted event
        event: &'static str,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Store failure other than not-found.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON encoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Builds a validation error from a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            violations: vec![message.into()],
        }
    }

    /// Whether the error is the caller's fault and maps to a 400-class rejection.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::UnexpectedEnum { .. }
                | Self::DuplicateCfp { .. }
                | Self::CfpNotFound { .. }
                | Self::PartNotFound { .. }
                | Self::PartInUse { .. }
                | Self::TradeNotFound { .. }
                | Self::StatusNotFound { .. }
                | Self::InvalidTransition { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_joins_violations() {
        let err = Error::Validation {
            violations: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(err.to_string(), "Validation failed: first, second");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_errors_are_not_client_errors() {
        let err = Error::from(sea_orm::DbErr::Custom("boom".to_string()));
        assert!(!err.is_client_error());
        assert!(Error::Inconsistent {
            field: "ghgDeclaredUnit",
            trace_id: Uuid::nil()
        }
        .to_string()
        .contains("ghgDeclaredUnit"));
    }
}
