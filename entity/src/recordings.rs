//! SeaORM Entity for the recordings table.
//! A recording is created at worker start when the meeting was dispatched with
//! recording enabled, and completed when the worker uploads finalized media.

use crate::recording_source::RecordingSource;
use crate::recording_status::RecordingStatus;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::recordings::Model)]
#[sea_orm(schema_name = "vexa", table_name = "recordings")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub meeting_id: Id,

    /// Audio session this recording belongs to
    #[schema(value_type = String, format = Uuid)]
    pub session_uid: Uuid,

    pub source: RecordingSource,

    pub status: RecordingStatus,

    /// Error message if capture or upload failed
    pub error_message: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meetings::Entity",
        from = "Column::MeetingId",
        to = "super::meetings::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Meetings,

    #[sea_orm(has_many = "super::media_files::Entity")]
    MediaFiles,
}

impl Related<super::meetings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meetings.def()
    }
}

impl Related<super::media_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
