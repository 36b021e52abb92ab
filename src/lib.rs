//! # Bridge Logger
//!
//! Concurrent acquisition of wireless sensor telemetry into InField-compatible
//! text logs.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌───────────┐
//! │ Bridge A  │   │ Bridge B  │   │ Bridge N  │      transmitters
//! └─────┬─────┘   └─────┬─────┘   └─────┬─────┘
//!       │ UDP :5005     │ UDP :5006     │ UDP :50xx
//!       ▼               ▼               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Channel Supervisor (supervisor)               │
//! │   start / stop / set calibration / status, per channel      │
//! │                                                             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │ Worker task  │  │ Worker task  │  │ Worker task  │       │
//! │  │  socket      │  │  socket      │  │  socket      │       │
//! │  │  parse       │  │  parse       │  │  parse       │       │
//! │  │  timebase    │  │  timebase    │  │  timebase    │       │
//! │  │  calibrate ◄─┼──┼─ watch ──────┼──┼─ updates     │       │
//! │  │  LogWriter   │  │  LogWriter   │  │  LogWriter   │       │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘       │
//! └─────────┼─────────────────┼─────────────────┼───────────────┘
//!           ▼                 ▼                 ▼
//!      bridge_a.txt      bridge_b.txt      bridge_n.txt
//! ```
//!
//! Workers share nothing on the sample path. Each owns its socket and its
//! log file for the whole session and is stopped through its own
//! cancellation signal.

pub mod calibration;
pub mod channel;
pub mod config;
pub mod error;
pub mod logfile;
pub mod network;
pub mod protocol;
pub mod supervisor;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Bind address for channels that do not specify one
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

    /// Largest UDP payload over IPv4
    pub const MAX_DATAGRAM_SIZE: usize = 65_507;

    /// Requested kernel receive buffer per socket
    pub const DEFAULT_RECV_BUFFER_BYTES: usize = 256 * 1024;

    /// Time a stop request waits for a worker before aborting it
    pub const DEFAULT_STOP_GRACE_MS: u64 = 2_000;

    /// Log file extension
    pub const DEFAULT_FILE_EXTENSION: &str = "txt";

    /// Decimal places of calibrated sample values
    pub const SAMPLE_DECIMALS: u32 = 1;

    /// Decimal places of fitted calibration coefficients
    pub const CALIBRATION_DECIMALS: u32 = 3;

    /// Interval between stats summaries in the CLI
    pub const STATS_INTERVAL_SECS: u64 = 5;
}
