pub mod cache;
pub mod gateway;
pub mod memory;
pub mod relay;

pub use cache::ClientStore;
pub use gateway::{CommittedBill, PersistenceGateway};
pub use memory::InMemoryGateway;
pub use relay::BroadcastRelay;
