pub mod admin;
pub mod client;
pub mod company;
pub mod invoice;
pub mod queue_entry;
pub mod quotation;
pub mod receipt;
pub mod record;
pub mod user;

pub use admin::{Admin, NewAdmin};
pub use client::{Client, NewClient};
pub use company::{Company, NewCompany};
pub use invoice::{Invoice, InvoiceItem, InvoiceStatus, NewInvoice};
pub use queue_entry::{QueueEntry, QueueOperation};
pub use quotation::{NewQuotation, Quotation, QuotationItem, QuotationStatus};
pub use receipt::{NewReceipt, PaymentMethod, Receipt};
pub use record::{FieldMap, Record};
pub use user::{NewUser, User, UserRole};
