use std::sync::Arc;

use crate::application::services::data_service::{DataService, Subscription};
use crate::domain::entities::{Client, FieldMap, NewClient};
use crate::domain::value_objects::{ActorId, RecordId, TenantId};
use crate::shared::error::Result;

/// Client directory of one company.
pub struct ClientService {
    data: Arc<DataService>,
}

impl ClientService {
    pub fn new(data: Arc<DataService>) -> Self {
        Self { data }
    }

    pub async fn create(&self, draft: &NewClient, actor: &ActorId) -> Result<RecordId> {
        self.data.add_as(draft, actor).await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Client>> {
        self.data.get_as(id).await
    }

    pub async fn list(&self, company: &TenantId) -> Result<Vec<Client>> {
        self.data.list_as(Some(company)).await
    }

    pub async fn update(&self, id: &RecordId, changes: FieldMap, actor: &ActorId) -> Result<()> {
        self.data.update_in::<Client>(id, changes, actor).await
    }

    pub async fn delete(&self, id: &RecordId, actor: &ActorId) -> Result<()> {
        self.data.delete_in::<Client>(id, actor).await
    }

    pub async fn subscribe<F>(&self, company: &TenantId, callback: F) -> Result<Subscription>
    where
        F: Fn(Vec<Client>) + Send + 'static,
    {
        self.data
            .subscribe_as::<Client, _>(Some(company), callback)
            .await
    }
}
