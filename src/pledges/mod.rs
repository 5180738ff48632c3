// Off-chain pledge and NGO records, behind store traits so the settlement
// engine runs identically on Postgres and on the in-memory demo stores.
pub mod models;
pub mod postgres;
pub mod store;

pub use models::{Ngo, Pledge, PledgeStatus};
pub use store::{InMemoryNgoStore, InMemoryPledgeStore, NgoStore, PledgeStore};
