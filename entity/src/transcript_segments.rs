//! SeaORM Entity for the transcript_segments table.
//! Append-only rows produced by the transcription sink, keyed by
//! (meeting_id, session_uid, start_ms). The control plane only ever deletes
//! them, as part of meeting anonymization.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::transcript_segments::Model)]
#[sea_orm(schema_name = "vexa", table_name = "transcript_segments")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub meeting_id: Id,

    #[schema(value_type = String, format = Uuid)]
    pub session_uid: Uuid,

    /// Offset of the segment start from the beginning of the session
    pub start_ms: i32,

    pub end_ms: i32,

    pub text: String,

    pub speaker: Option<String>,

    pub language: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
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
}

impl Related<super::meetings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meetings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
