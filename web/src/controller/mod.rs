use crate::Error;
use serde::Serialize;

pub(crate) mod admin_controller;
pub(crate) mod bot_controller;
pub(crate) mod callback_controller;
pub(crate) mod health_check_controller;
pub(crate) mod meeting_controller;
pub(crate) mod recording_controller;
pub(crate) mod transcript_controller;

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    // Eventually we can add meta, errors, etc.
    status_code: u16,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, data: T) -> Self {
        Self { status_code, data }
    }
}

/// Helper to create a not-found error
fn not_found_error() -> Error {
    Error::Domain(domain::error::Error {
        source: None,
        error_kind: domain::error::DomainErrorKind::Internal(
            domain::error::InternalErrorKind::Entity(domain::error::EntityErrorKind::NotFound),
        ),
    })
}

/// Helper to create a validation error
fn validation_error() -> Error {
    Error::Domain(domain::error::Error {
        source: None,
        error_kind: domain::error::DomainErrorKind::Internal(
            domain::error::InternalErrorKind::Entity(domain::error::EntityErrorKind::Invalid),
        ),
    })
}
