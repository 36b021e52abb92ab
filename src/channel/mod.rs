//! Per-channel acquisition
//!
//! One worker per sensor bridge: it owns a UDP socket and a log sink and
//! runs receive, parse, normalize, calibrate, write until cancelled.

pub mod cancel;
pub mod monitor;
pub mod state;
pub mod timebase;
pub mod worker;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use monitor::{ChannelMonitor, ChannelStats, StatsSnapshot};
pub use state::ChannelState;
pub use timebase::{Adjustment, Timebase};
pub use worker::{ChannelWorker, DatagramProcessor};
