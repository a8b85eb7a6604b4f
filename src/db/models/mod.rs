pub mod snapshot;

pub use snapshot::{ChannelValues, NewSnapshot, SnapshotRecord};
