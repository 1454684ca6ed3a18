pub mod bill;
pub mod builder;
pub mod ledger;
pub mod line_item;
pub mod tax;

pub use bill::{Bill, BillKind};
pub use builder::{BillBuilder, BillDraft, Totals, compute_totals};
pub use ledger::{PaymentEntry, PaymentLedger, PaymentOutcome, PaymentRequest, PaymentStatus};
pub use line_item::{Dimensions, LineItem};
pub use tax::{Jurisdiction, TaxBreakdown};
