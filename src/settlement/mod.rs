// Weekly settlement pipeline: aggregate pending pledges, submit one batch
// to the settlement ledger, reconcile the outcome into a receipt.
pub mod aggregator;
pub mod backend;
pub mod orchestrator;
pub mod scheduler;
pub mod solana;

pub use aggregator::{Aggregator, Allocation};
pub use backend::{LedgerBackend, SettlementBackend, TxOutcome};
pub use orchestrator::{SettlementOrchestrator, SettlementOutcome};
pub use scheduler::SettlementScheduler;
pub use solana::SolanaBackend;
