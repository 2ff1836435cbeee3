pub mod admin_service;
pub mod client_service;
pub mod company_service;
pub mod data_service;
pub mod invoice_service;
pub mod network_monitor;
pub mod quotation_service;
pub mod receipt_service;
pub mod sync_queue;
pub mod user_service;

pub use admin_service::AdminService;
pub use client_service::ClientService;
pub use company_service::CompanyService;
pub use data_service::{DataService, Subscription};
pub use invoice_service::InvoiceService;
pub use network_monitor::{NetworkMonitor, NetworkStatus};
pub use quotation_service::QuotationService;
pub use receipt_service::ReceiptService;
pub use sync_queue::{DrainOutcome, DrainReport, SyncQueue};
pub use user_service::UserService;
