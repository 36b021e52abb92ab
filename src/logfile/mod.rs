//! InField-compatible log files
//!
//! A log file is a fixed `DM_` key/value header followed by one
//! tab-separated `time<TAB>value` line per sample, CRLF throughout.

pub mod header;
pub mod reader;
pub mod writer;

pub use header::{AxisDescriptor, LogHeader};
pub use reader::{read_log, LogContents};
pub use writer::{LogWriter, MemorySink, SinkTarget};

/// Line terminator expected by the analysis tool
pub const CRLF: &str = "\r\n";

/// Marker line that ends the header
pub const DATA_START: &str = "DM_Start=";
