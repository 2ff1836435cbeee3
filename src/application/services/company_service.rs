use std::sync::Arc;

use crate::application::services::data_service::DataService;
use crate::domain::entities::{Company, FieldMap, NewCompany};
use crate::domain::value_objects::{ActorId, RecordId};
use crate::shared::error::Result;

/// Company profiles. One record per tenant, addressed by id rather than
/// listed, so there is no tenant-scoped query here.
pub struct CompanyService {
    data: Arc<DataService>,
}

impl CompanyService {
    pub fn new(data: Arc<DataService>) -> Self {
        Self { data }
    }

    pub async fn create(&self, draft: &NewCompany, actor: &ActorId) -> Result<RecordId> {
        self.data.add_as(draft, actor).await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Company>> {
        self.data.get_as(id).await
    }

    pub async fn update(&self, id: &RecordId, changes: FieldMap, actor: &ActorId) -> Result<()> {
        self.data.update_in::<Company>(id, changes, actor).await
    }
}
