//! Wall-clock host for a liftoff table.
//!
//! [`LiveTable`] drives a [`liftoff_execution::RoundEngine`] from a tokio task
//! and fans its events out to subscribers. [`Args`] is the command line and
//! environment surface used by the `liftoff-live-table` binary.

pub mod config;
pub mod table;

pub use config::Args;
pub use table::LiveTable;
