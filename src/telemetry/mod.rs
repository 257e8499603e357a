//! UI telemetry: event format and the broadcast endpoint.

pub mod protocol;
pub mod server;

pub use protocol::TelemetryEvent;
pub use server::{TelemetryBroadcaster, TelemetryHub, TelemetryServer};
