//! Invoice aggregate

pub mod model;
pub mod repository;

pub use model::{
    BillingPeriod, EnterpriseInvoice, EnterpriseLineItem, Invoice, InvoiceStatus, PaymentMethod,
    PaymentRecord,
};
pub use repository::InvoiceRepository;
