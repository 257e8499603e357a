//! Sensor ingestion: the glove frame codec and the connection supervisor.

pub mod frame;
pub mod supervisor;

pub use frame::{FrameError, SensorSample, decode};
pub use supervisor::{ConnectionState, ConnectionSupervisor, FrameHandler, Liveness};
