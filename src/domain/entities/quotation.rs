use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::schema::CollectionModel;
use crate::domain::value_objects::{ActorId, RecordId, TenantId};

/// Quotation statuses keep their display casing on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotationStatus {
    Draft,
    Sent,
    Accepted,
    Declined,
    Expired,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            QuotationStatus::Draft => "Draft",
            QuotationStatus::Sent => "Sent",
            QuotationStatus::Accepted => "Accepted",
            QuotationStatus::Declined => "Declined",
            QuotationStatus::Expired => "Expired",
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// A priced offer that may later become an invoice. Dates are calendar
/// days, not instants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: RecordId,
    pub company_id: TenantId,
    pub client_id: RecordId,
    pub client_name: String,
    pub items: Vec<QuotationItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub status: QuotationStatus,
    pub date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_by: ActorId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewQuotation {
    pub company_id: TenantId,
    pub client_id: RecordId,
    pub client_name: String,
    pub items: Vec<QuotationItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub status: QuotationStatus,
    pub date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_by: ActorId,
}

impl CollectionModel for Quotation {
    const COLLECTION: &'static str = "quotations";
}

impl CollectionModel for NewQuotation {
    const COLLECTION: &'static str = "quotations";
}
