pub mod ledger;
pub mod ledger_manager;
pub mod random;
pub mod settlement;
pub mod store;

pub use ledger::{Ledger, Registration};
pub use ledger_manager::{LedgerHandle, LedgerManager, LedgerRequest};
pub use random::{RandomSource, SeededRandom, ThreadRandom, RELIEF_RANGE};
pub use settlement::{SettlementReport, WagerOutcome};
pub use store::{SnapshotStore, StoreConfig, StoreError};
