use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::schema::CollectionModel;
use crate::domain::value_objects::RecordId;

/// A tenant: the business issuing invoices. Branding assets are stored
/// inline as data URLs by the application shell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: RecordId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_stamp: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_registration_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewCompany {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_stamp: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_registration_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionModel for Company {
    const COLLECTION: &'static str = "companies";
}

impl CollectionModel for NewCompany {
    const COLLECTION: &'static str = "companies";
}
