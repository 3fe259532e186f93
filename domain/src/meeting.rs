//! Meeting operations behind the HTTP control plane.
//!
//! Everything here is caller-scoped: a meeting is only ever resolved through
//! its owner plus the (platform, native id) pair from the URL. The lifecycle
//! manager owns dispatch/stop/reconfigure; this module covers the read and
//! bookkeeping paths.

use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use entity::meetings::Model;
use entity::platform::Platform;
use entity::Id;
use entity_api::meeting as registry;
use log::*;
use sea_orm::DatabaseConnection;
use serde_json::Value;

pub use entity_api::meeting::{dispatch_key_digest, find_by_id};

/// Parses the platform path segment; unknown platforms are a validation
/// error, never a registry lookup.
pub fn resolve_platform(platform: &str) -> Result<Platform, Error> {
    platform.parse::<Platform>().map_err(|_| Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid)),
    })
}

/// The caller's single non-terminal meeting for a dispatch key.
pub async fn find_active(
    db: &DatabaseConnection,
    owner_id: Id,
    platform: Platform,
    native_meeting_id: &str,
) -> Result<Option<Model>, Error> {
    Ok(registry::find_active_by_owner_platform_native(db, owner_id, platform, native_meeting_id)
        .await?)
}

/// The caller's most recent meeting for a dispatch key, any status.
pub async fn find_latest(
    db: &DatabaseConnection,
    owner_id: Id,
    platform: Platform,
    native_meeting_id: &str,
) -> Result<Option<Model>, Error> {
    Ok(registry::find_latest_by_owner_platform_native(db, owner_id, platform, native_meeting_id)
        .await?)
}

pub async fn list(db: &DatabaseConnection, owner_id: Id) -> Result<Vec<Model>, Error> {
    Ok(registry::list_by_owner(db, owner_id).await?)
}

pub async fn list_active(db: &DatabaseConnection, owner_id: Id) -> Result<Vec<Model>, Error> {
    Ok(registry::list_active_by_owner(db, owner_id).await?)
}

/// Merges a PATCH body into the meeting's data bag: top-level keys are
/// upserted, explicit nulls remove keys.
pub async fn patch_data(
    db: &DatabaseConnection,
    owner_id: Id,
    platform: Platform,
    native_meeting_id: &str,
    patch: Value,
) -> Result<Model, Error> {
    let meeting = find_latest(db, owner_id, platform, native_meeting_id)
        .await?
        .ok_or_else(Error::not_found)?;

    let Value::Object(patch) = patch else {
        return Err(Error::invalid());
    };

    let mut data = match meeting.data.clone() {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    for (key, value) in patch {
        if value.is_null() {
            data.remove(&key);
        } else {
            data.insert(key, value);
        }
    }

    Ok(registry::update_data(db, meeting.id, Value::Object(data)).await?)
}

/// Anonymizes the caller's meeting for a dispatch key. Idempotent: once the
/// native id is nulled the row is still resolvable through its dispatch-key
/// digest, so a second delete finds the scrubbed row and succeeds again.
pub async fn delete(
    db: &DatabaseConnection,
    owner_id: Id,
    platform: Platform,
    native_meeting_id: &str,
) -> Result<Model, Error> {
    if let Some(meeting) = find_latest(db, owner_id, platform, native_meeting_id).await? {
        if !meeting.status.is_terminal() {
            debug!(
                "Refusing to anonymize non-terminal meeting {} ({})",
                meeting.id, meeting.status
            );
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                    EntityErrorKind::Conflict,
                )),
            });
        }
        return Ok(registry::anonymize(db, meeting.id).await?);
    }

    // Already anonymized? The digest still resolves it.
    let digest = dispatch_key_digest(owner_id, platform, native_meeting_id);
    match registry::find_anonymized_by_digest(db, &digest).await? {
        Some(meeting) => Ok(registry::anonymize(db, meeting.id).await?),
        None => Err(Error::not_found()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_platform_accepts_known_platforms() {
        assert_eq!(resolve_platform("google_meet").unwrap(), Platform::GoogleMeet);
        assert_eq!(resolve_platform("teams").unwrap(), Platform::Teams);
        assert_eq!(resolve_platform("zoom").unwrap(), Platform::Zoom);
    }

    #[test]
    fn test_resolve_platform_rejects_unknown_platforms() {
        let err = resolve_platform("webex").unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid))
        );
    }
}
