use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::schema::CollectionModel;
use crate::domain::value_objects::{ActorId, RecordId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Manager,
    Admin,
    Seller,
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
            UserRole::Seller => "seller",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An account belonging to a company. Sellers can be deactivated by a
/// manager without deleting their history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub company_id: TenantId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub company_id: TenantId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }
}

impl CollectionModel for User {
    const COLLECTION: &'static str = "users";
}

impl CollectionModel for NewUser {
    const COLLECTION: &'static str = "users";
}
