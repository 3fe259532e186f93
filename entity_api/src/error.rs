//! Error types for entity API
use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

use sea_orm::error::DbErr;

/// Errors while executing operations related to entities.
/// The intent is to categorize errors into two major types:
///  * Errors related to data. Ex DbError::RecordNotFound
///  * Errors related to interactions with the database itself. Ex DbError::Conn
#[derive(Debug, PartialEq)]
pub struct Error {
    // Underlying error emitted from seaORM internals
    pub source: Option<DbErr>,
    // Enum representing which category of error
    pub error_kind: EntityApiErrorKind,
}

#[derive(Debug, PartialEq, Serialize)]
pub enum EntityApiErrorKind {
    // Invalid search term
    InvalidQueryTerm,
    // Record not found
    RecordNotFound,
    // Record not updated
    RecordNotUpdated,
    // Another non-terminal meeting exists for the same dispatch key
    UniquenessConflict,
    // The owner is at their max_concurrent_bots ceiling
    ConcurrencyLimit,
    // Conditional status update found the row outside its from-set
    InvalidTransition,
    // Errors related to interactions with the database itself. Ex DbError::Conn
    SystemError,
    // Validation error
    ValidationError,
    // Other errors
    Other,
}

impl Error {
    pub(crate) fn not_found() -> Self {
        Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
    }

    pub(crate) fn validation() -> Self {
        Error {
            source: None,
            error_kind: EntityApiErrorKind::ValidationError,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Entity API Error: {:?}", self)
    }
}

impl StdError for Error {}

/// Postgres signals a violated unique constraint with SQLSTATE 23505. The
/// partial unique index on non-terminal meetings surfaces dispatch races this
/// way, so the insert error has to be distinguishable from plain SystemError.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    let text = err.to_string();
    text.contains("23505") || text.contains("duplicate key")
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        if is_unique_violation(&err) {
            return Error {
                source: Some(err),
                error_kind: EntityApiErrorKind::UniquenessConflict,
            };
        }
        match err {
            DbErr::RecordNotFound(_) => Error {
                source: Some(err),
                error_kind: EntityApiErrorKind::RecordNotFound,
            },
            DbErr::RecordNotUpdated => Error {
                source: Some(err),
                error_kind: EntityApiErrorKind::RecordNotUpdated,
            },
            DbErr::ConnectionAcquire(_) => Error {
                source: Some(err),
                error_kind: EntityApiErrorKind::SystemError,
            },
            DbErr::Conn(_) => Error {
                source: Some(err),
                error_kind: EntityApiErrorKind::SystemError,
            },
            DbErr::Exec(_) => Error {
                source: Some(err),
                error_kind: EntityApiErrorKind::SystemError,
            },
            _ => Error {
                source: Some(err),
                error_kind: EntityApiErrorKind::SystemError,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_is_detected_from_sqlstate() {
        let err = DbErr::Exec(sea_orm::RuntimeErr::Internal(
            "error returned from database: duplicate key value violates unique constraint \
             \"meetings_dispatch_key_active_idx\" (SQLSTATE 23505)"
                .to_string(),
        ));
        assert!(is_unique_violation(&err));
        let error: Error = err.into();
        assert_eq!(error.error_kind, EntityApiErrorKind::UniquenessConflict);
    }

    #[test]
    fn test_other_exec_errors_stay_system_errors() {
        let err = DbErr::Exec(sea_orm::RuntimeErr::Internal("connection reset".to_string()));
        let error: Error = err.into();
        assert_eq!(error.error_kind, EntityApiErrorKind::SystemError);
    }
}
