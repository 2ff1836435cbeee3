use std::sync::Arc;

use crate::application::services::data_service::DataService;
use crate::domain::entities::{Admin, FieldMap, NewAdmin};
use crate::domain::value_objects::{ActorId, RecordId};
use crate::shared::error::Result;

/// Platform administrators. Not tenant-scoped; the collection is tiny and
/// scanned rather than queried.
pub struct AdminService {
    data: Arc<DataService>,
}

impl AdminService {
    pub fn new(data: Arc<DataService>) -> Self {
        Self { data }
    }

    pub async fn create(&self, draft: &NewAdmin, actor: &ActorId) -> Result<RecordId> {
        self.data.add_as(draft, actor).await
    }

    pub async fn list_all(&self) -> Result<Vec<Admin>> {
        self.data.list_as(None).await
    }

    pub async fn update(&self, id: &RecordId, changes: FieldMap, actor: &ActorId) -> Result<()> {
        self.data.update_in::<Admin>(id, changes, actor).await
    }

    pub async fn delete(&self, id: &RecordId, actor: &ActorId) -> Result<()> {
        self.data.delete_in::<Admin>(id, actor).await
    }

    /// Probe used before provisioning: does an active admin already hold
    /// this email? Matching ignores case.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let wanted = email.to_lowercase();
        let admins = self.list_all().await?;
        Ok(admins
            .iter()
            .any(|admin| admin.is_active && admin.email.to_lowercase() == wanted))
    }
}
