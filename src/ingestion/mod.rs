pub mod classifier;
pub mod discovery;
pub mod tx_monitor;

pub use discovery::{DiscoverySummary, WhaleDiscovery};
pub use tx_monitor::{MonitorSummary, TransactionMonitor};
