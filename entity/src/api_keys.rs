//! SeaORM Entity for the api_keys table.
//! API keys authenticate the user-facing HTTP plane. Only the sha-256 of the
//! issued token is stored; the plaintext is returned once at issuance.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::api_keys::Model)]
#[sea_orm(schema_name = "vexa", table_name = "api_keys")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub user_id: Id,

    #[serde(skip_serializing)]
    #[sea_orm(unique)]
    pub token_hash: String,

    pub label: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    /// Set when the key is revoked; revoked keys never authenticate
    #[schema(value_type = Option<String>, format = DateTime)]
    pub revoked_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
