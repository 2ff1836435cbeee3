use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::application::services::data_service::DataService;
use crate::domain::entities::{FieldMap, NewUser, User};
use crate::domain::value_objects::{ActorId, RecordId, TenantId};
use crate::shared::error::Result;

/// Accounts within a company. Deactivation is the soft alternative to
/// deleting a seller with history.
pub struct UserService {
    data: Arc<DataService>,
}

impl UserService {
    pub fn new(data: Arc<DataService>) -> Self {
        Self { data }
    }

    pub async fn create(&self, draft: &NewUser, actor: &ActorId) -> Result<RecordId> {
        self.data.add_as(draft, actor).await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<User>> {
        self.data.get_as(id).await
    }

    pub async fn list(&self, company: &TenantId) -> Result<Vec<User>> {
        self.data.list_as(Some(company)).await
    }

    pub async fn update(&self, id: &RecordId, changes: FieldMap, actor: &ActorId) -> Result<()> {
        self.data.update_in::<User>(id, changes, actor).await
    }

    pub async fn set_active(&self, id: &RecordId, active: bool, actor: &ActorId) -> Result<()> {
        let mut changes = FieldMap::new();
        changes.insert("isActive".to_string(), Value::Bool(active));
        changes.insert("updatedAt".to_string(), serde_json::to_value(Utc::now())?);
        self.update(id, changes, actor).await
    }

    pub async fn delete(&self, id: &RecordId, actor: &ActorId) -> Result<()> {
        self.data.delete_in::<User>(id, actor).await
    }
}
