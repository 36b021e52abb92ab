//! Inbound wire format
//!
//! Each datagram is UTF-8 text holding one or more newline-separated
//! `rawTimestamp,rawValue` records.

pub mod record;

pub use record::{parse_datagram, RawRecord};
