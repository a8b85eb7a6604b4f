pub mod channel;
pub mod controller;
pub mod events;
pub mod replay;
pub mod sampler;
pub mod source;
pub mod state;

pub use channel::{join_components, parse_components, SensorType};
pub use controller::SamplerController;
pub use events::{LocationReading, SensorAccuracy, SensorEvent, SourceEvent};
pub use replay::ReplaySource;
pub use sampler::SensorSampler;
pub use source::{Registration, SamplingRequest, SensorSource};
pub use state::SensorState;
