//! Channel supervision
//!
//! Starts and stops channel workers, routes control commands to them and
//! keeps the per-channel status map. Never touches a socket or file.

pub mod handle;
pub mod manager;

pub use handle::ChannelHandle;
pub use manager::ChannelSupervisor;

/// Supervisor-assigned channel identifier
pub type ChannelId = u32;
