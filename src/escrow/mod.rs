// Escrow ledger state machine: the authoritative vault + whitelist state.
pub mod ledger;
pub mod state;

pub use ledger::EscrowLedger;
pub use state::{
    BatchAllocation, BatchOutcome, DepositOutcome, DisbursementDetail, EscrowStatus,
};
