mod billing;

pub use billing::{BillingService, PaymentReceipt};
