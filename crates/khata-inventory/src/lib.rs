pub mod item;
pub mod plan;

pub use item::{InventoryDraft, InventoryItem};
pub use plan::{StockAdjustment, StockDirection, StockPlan};
