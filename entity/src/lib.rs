pub mod prelude;

// Control-plane entities
pub mod api_keys;
pub mod media_files;
pub mod meetings;
pub mod recordings;
pub mod transcript_segments;
pub mod users;

// Enum column types
pub mod completion_reason;
pub mod failure_stage;
pub mod media_kind;
pub mod meeting_status;
pub mod platform;
pub mod recording_source;
pub mod recording_status;

/// A type alias that represents any Entity's internal id field data type.
/// Meeting ids are handed to clients in insertion order, so the control
/// plane uses a plain integer sequence rather than a UUID.
pub type Id = i32;
