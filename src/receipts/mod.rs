// Append-only settlement receipts. One receipt per settled week; the
// receipt is the off-chain record of record for what the ledger paid.
pub mod models;
pub mod postgres;
pub mod store;

pub use models::{Receipt, ReceiptAllocation};
pub use store::{InMemoryReceiptStore, ReceiptStore};
