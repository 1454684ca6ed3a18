pub mod error;
pub mod events;
pub mod models;
pub mod money;
pub mod relay;

pub use error::{BillingError, BillingResult};
pub use events::{EntityKind, RelayEvent, RelayEventKind};
pub use models::{EntityId, Party, PartyDraft, PartyRole};
pub use relay::{LiveRelay, NoopRelay};
