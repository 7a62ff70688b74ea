pub mod aggregator;
pub mod chain;
pub mod format;
pub mod monitor;
pub mod price;
