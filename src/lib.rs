pub mod types;
pub mod sequence;
pub mod ledger;
pub mod lifecycle;
pub mod context;
pub mod statistics;
pub mod client;
pub mod utils;

pub use client::{ClientInstance, ClientOptions};
pub use context::ContextExchange;
pub use ledger::{LedgerAdapter, MemoryLedger};
pub use lifecycle::TransactionLifecycle;
pub use sequence::SequenceAllocator;
pub use statistics::StatisticsWindow;
