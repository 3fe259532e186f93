//! SeaORM Entity for the media_files table.
//! One row per stored artifact of a recording; `storage_key` is the object
//! key (or local path) under the configured storage backend.

use crate::media_kind::MediaKind;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::media_files::Model)]
#[sea_orm(schema_name = "vexa", table_name = "media_files")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub recording_id: Id,

    pub kind: MediaKind,

    /// Container format, e.g. "webm" or "wav"
    pub format: String,

    pub size_bytes: i64,

    pub duration_seconds: Option<i32>,

    #[serde(skip_serializing)]
    pub storage_key: String,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recordings::Entity",
        from = "Column::RecordingId",
        to = "super::recordings::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Recordings,
}

impl Related<super::recordings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recordings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
