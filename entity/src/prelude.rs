pub use super::api_keys::Entity as ApiKeys;
pub use super::media_files::Entity as MediaFiles;
pub use super::meetings::Entity as Meetings;
pub use super::recordings::Entity as Recordings;
pub use super::transcript_segments::Entity as TranscriptSegments;
pub use super::users::Entity as Users;
