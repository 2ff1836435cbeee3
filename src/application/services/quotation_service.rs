use std::sync::Arc;

use crate::application::services::data_service::{DataService, Subscription};
use crate::domain::entities::{FieldMap, NewQuotation, Quotation};
use crate::domain::value_objects::{ActorId, RecordId, TenantId};
use crate::shared::error::Result;

/// Quotations of one company.
pub struct QuotationService {
    data: Arc<DataService>,
}

impl QuotationService {
    pub fn new(data: Arc<DataService>) -> Self {
        Self { data }
    }

    pub async fn create(&self, draft: &NewQuotation, actor: &ActorId) -> Result<RecordId> {
        self.data.add_as(draft, actor).await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Quotation>> {
        self.data.get_as(id).await
    }

    pub async fn list(&self, company: &TenantId) -> Result<Vec<Quotation>> {
        self.data.list_as(Some(company)).await
    }

    pub async fn list_by_seller(
        &self,
        company: &TenantId,
        seller: &ActorId,
    ) -> Result<Vec<Quotation>> {
        let quotations = self.list(company).await?;
        Ok(quotations
            .into_iter()
            .filter(|quotation| quotation.created_by == *seller)
            .collect())
    }

    pub async fn update(&self, id: &RecordId, changes: FieldMap, actor: &ActorId) -> Result<()> {
        self.data.update_in::<Quotation>(id, changes, actor).await
    }

    pub async fn delete(&self, id: &RecordId, actor: &ActorId) -> Result<()> {
        self.data.delete_in::<Quotation>(id, actor).await
    }

    pub async fn subscribe<F>(&self, company: &TenantId, callback: F) -> Result<Subscription>
    where
        F: Fn(Vec<Quotation>) + Send + 'static,
    {
        self.data
            .subscribe_as::<Quotation, _>(Some(company), callback)
            .await
    }
}
