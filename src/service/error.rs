//! Infrastructure failures reported by the service
//!
//! Business outcomes (insufficient points, already signed, already liked)
//! are *not* errors; they travel as [`CommonResponse`](super::CommonResponse)
//! values.

use serde::Serialize;

use crate::ledger::LedgerError;

/// Coarse classification used by transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Internal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidArgument => 400,
            Self::Unauthenticated => 401,
            Self::PermissionDenied => 403,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Internal {
        context: &'static str,
        #[source]
        source: LedgerError,
    },
}

impl ServiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthenticated(_) => ErrorClass::Unauthenticated,
            Self::InvalidArgument(_) => ErrorClass::InvalidArgument,
            Self::PermissionDenied(_) => ErrorClass::PermissionDenied,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Internal { .. } => ErrorClass::Internal,
        }
    }

    /// `map_err` adapter wrapping a ledger failure as an internal error
    pub(crate) fn internal(context: &'static str) -> impl FnOnce(LedgerError) -> ServiceError {
        move |source| ServiceError::Internal { context, source }
    }
}
