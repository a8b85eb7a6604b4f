pub mod controller;
pub mod loop_worker;
pub mod stats;
pub mod store;

pub use controller::{RecorderController, RecorderStatus};
pub use loop_worker::{capture_snapshot, format_timestamp, TickOutcome, TIME_FORMAT};
pub use stats::RecorderStats;
pub use store::SnapshotStore;
