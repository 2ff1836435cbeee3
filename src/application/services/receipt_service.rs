use std::sync::Arc;

use chrono::Utc;

use crate::application::services::data_service::{DataService, Subscription};
use crate::domain::entities::{FieldMap, Invoice, NewReceipt, PaymentMethod, Receipt};
use crate::domain::value_objects::{ActorId, RecordId, TenantId};
use crate::shared::error::Result;

/// Payments recorded against invoices.
pub struct ReceiptService {
    data: Arc<DataService>,
}

impl ReceiptService {
    pub fn new(data: Arc<DataService>) -> Self {
        Self { data }
    }

    pub async fn create(&self, draft: &NewReceipt, actor: &ActorId) -> Result<RecordId> {
        self.data.add_as(draft, actor).await
    }

    /// Drafts the receipt for an invoice that was just settled in full.
    pub async fn create_for_invoice(
        &self,
        invoice: &Invoice,
        method: PaymentMethod,
        actor: &ActorId,
    ) -> Result<RecordId> {
        let now = Utc::now();
        let draft = NewReceipt {
            company_id: invoice.company_id.clone(),
            invoice_id: invoice.id.clone(),
            amount: invoice.total,
            method,
            date: now,
            notes: Some(format!(
                "Payment received for invoice {}",
                invoice.invoice_number
            )),
            created_at: now,
            updated_at: now,
            created_by: Some(actor.clone()),
        };
        self.create(&draft, actor).await
    }

    pub async fn get(&self, id: &RecordId) -> Result<Option<Receipt>> {
        self.data.get_as(id).await
    }

    pub async fn list(&self, company: &TenantId) -> Result<Vec<Receipt>> {
        self.data.list_as(Some(company)).await
    }

    pub async fn list_by_seller(
        &self,
        company: &TenantId,
        seller: &ActorId,
    ) -> Result<Vec<Receipt>> {
        let receipts = self.list(company).await?;
        Ok(receipts
            .into_iter()
            .filter(|receipt| receipt.created_by.as_ref() == Some(seller))
            .collect())
    }

    pub async fn update(&self, id: &RecordId, changes: FieldMap, actor: &ActorId) -> Result<()> {
        self.data.update_in::<Receipt>(id, changes, actor).await
    }

    pub async fn delete(&self, id: &RecordId, actor: &ActorId) -> Result<()> {
        self.data.delete_in::<Receipt>(id, actor).await
    }

    pub async fn subscribe<F>(&self, company: &TenantId, callback: F) -> Result<Subscription>
    where
        F: Fn(Vec<Receipt>) + Send + 'static,
    {
        self.data
            .subscribe_as::<Receipt, _>(Some(company), callback)
            .await
    }
}
