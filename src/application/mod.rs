pub mod mappers;
pub mod ports;
pub mod services;

pub use services::{
    AdminService, ClientService, CompanyService, DataService, InvoiceService, NetworkMonitor,
    NetworkStatus, QuotationService, ReceiptService, Subscription, SyncQueue, UserService,
};
