use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::schema::CollectionModel;
use crate::domain::value_objects::{RecordId, TenantId};

/// A billable customer of a company.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: RecordId,
    pub company_id: TenantId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload for a client; the id is assigned by the data layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub company_id: TenantId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionModel for Client {
    const COLLECTION: &'static str = "clients";
}

impl CollectionModel for NewClient {
    const COLLECTION: &'static str = "clients";
}
