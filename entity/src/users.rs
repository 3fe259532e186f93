//! SeaORM Entity for the users table.
//! Users own meetings and API keys; created administratively.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::users::Model)]
#[sea_orm(schema_name = "vexa", table_name = "users")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    #[sea_orm(unique)]
    pub email: String,

    pub display_name: Option<String>,

    /// Ceiling on simultaneously-active bots for this user
    pub max_concurrent_bots: i32,

    /// Callback URL for terminal lifecycle notifications
    pub webhook_url: Option<String>,

    /// Bearer secret sent with webhook deliveries. Never serialized out.
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,

    /// Last webhook delivery error, recorded after retries are exhausted
    pub webhook_last_error: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::meetings::Entity")]
    Meetings,

    #[sea_orm(has_many = "super::api_keys::Entity")]
    ApiKeys,
}

impl Related<super::meetings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meetings.def()
    }
}

impl Related<super::api_keys::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiKeys.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
