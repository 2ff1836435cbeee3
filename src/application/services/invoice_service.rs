use std::sync::Arc;

use chrono::Utc;

use crate::application::services::data_service::{DataService, Subscription};
use crate::domain::entities::{FieldMap, Invoice, InvoiceStatus, NewInvoice};
use crate::domain::value_objects::{ActorId, RecordId, TenantId};
use crate::shared::error::Result;

/// Invoices of one company.
pub struct InvoiceService {
    data: Arc<DataService>,
}

impl InvoiceService {
    pub fn new(data: Arc<DataService>) -> Self {
        Self { data }
    }

    pub async fn create(&self, draft: &NewInvoice, actor: &ActorId) -> Result<RecordId> {
        self.data.add_as(draft, actor).await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Invoice>> {
        self.data.get_as(id).await
    }

    pub async fn list(&self, company: &TenantId) -> Result<Vec<Invoice>> {
        self.data.list_as(Some(company)).await
    }

    /// The company's invoices narrowed to one seller. Attribution is a plain
    /// field, so the narrowing happens here rather than in the store.
    pub async fn list_by_seller(
        &self,
        company: &TenantId,
        seller: &ActorId,
    ) -> Result<Vec<Invoice>> {
        let invoices = self.list(company).await?;
        Ok(invoices
            .into_iter()
            .filter(|invoice| invoice.created_by.as_ref() == Some(seller))
            .collect())
    }

    pub async fn update(&self, id: &RecordId, changes: FieldMap, actor: &ActorId) -> Result<()> {
        self.data.update_in::<Invoice>(id, changes, actor).await
    }

    /// Moves an invoice through its lifecycle, stamping the update time.
    pub async fn set_status(
        &self,
        id: &RecordId,
        status: InvoiceStatus,
        actor: &ActorId,
    ) -> Result<()> {
        let mut changes = FieldMap::new();
        changes.insert("status".to_string(), serde_json::to_value(status)?);
        changes.insert("updatedAt".to_string(), serde_json::to_value(Utc::now())?);
        self.update(id, changes, actor).await
    }

    pub async fn delete(&self, id: &RecordId, actor: &ActorId) -> Result<()> {
        self.data.delete_in::<Invoice>(id, actor).await
    }

    pub async fn subscribe<F>(&self, company: &TenantId, callback: F) -> Result<Subscription>
    where
        F: Fn(Vec<Invoice>) + Send + 'static,
    {
        self.data
            .subscribe_as::<Invoice, _>(Some(company), callback)
            .await
    }
}
