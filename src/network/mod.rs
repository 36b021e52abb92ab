//! Network subsystem for UDP telemetry transport

pub mod udp;

pub use udp::{bind_udp, create_socket};
