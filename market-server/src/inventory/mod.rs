//! 库存账本 - 商户库存行的原子增减与多商户预留

mod ledger;

pub use ledger::{InventoryError, InventoryLedger, InventoryResult, Reservation, Settlement};
