use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::schema::CollectionModel;
use crate::domain::value_objects::{ActorId, RecordId};

/// Platform administrator, outside any tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: RecordId,
    pub email: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by: Option<ActorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewAdmin {
    pub email: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by: Option<ActorId>,
}

impl CollectionModel for Admin {
    const COLLECTION: &'static str = "admins";
}

impl CollectionModel for NewAdmin {
    const COLLECTION: &'static str = "admins";
}
