//! Sample record parsing

use std::str::FromStr;

use crate::error::RecordError;

/// One sample as sent by a transmitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRecord {
    /// Hardware tick counter, wraps at a device-defined period
    pub raw_timestamp: u32,
    /// Uncalibrated sensor reading
    pub raw_value: f64,
}

impl FromStr for RawRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 2 {
            return Err(RecordError::FieldCount(fields.len()));
        }

        let ts = fields[0].trim();
        let raw_timestamp = ts
            .parse::<u32>()
            .map_err(|_| RecordError::InvalidTimestamp(ts.to_string()))?;

        let value = fields[1].trim();
        let raw_value = value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| RecordError::InvalidValue(value.to_string()))?;

        Ok(Self {
            raw_timestamp,
            raw_value,
        })
    }
}

/// Split a datagram into per-line parse results.
///
/// Blank lines (including the one after a trailing newline) are dropped
/// rather than reported. A datagram that is not UTF-8 yields a single error.
pub fn parse_datagram(payload: &[u8]) -> Vec<Result<RawRecord, RecordError>> {
    let text = match std::str::from_utf8(payload) {
        Ok(text) => text,
        Err(_) => return vec![Err(RecordError::InvalidUtf8)],
    };

    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let rec: RawRecord = "123456,512".parse().unwrap();
        assert_eq!(rec.raw_timestamp, 123456);
        assert_eq!(rec.raw_value, 512.0);

        let rec: RawRecord = " 7 , -1.25 ".parse().unwrap();
        assert_eq!(rec.raw_timestamp, 7);
        assert_eq!(rec.raw_value, -1.25);
    }

    #[test]
    fn test_malformed_records() {
        assert_eq!(
            "BADLINE".parse::<RawRecord>(),
            Err(RecordError::FieldCount(1))
        );
        assert_eq!(
            "1,2,3".parse::<RawRecord>(),
            Err(RecordError::FieldCount(3))
        );
        assert!(matches!(
            "-5,2".parse::<RawRecord>(),
            Err(RecordError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            "5,abc".parse::<RawRecord>(),
            Err(RecordError::InvalidValue(_))
        ));
        assert!(matches!(
            "5,NaN".parse::<RawRecord>(),
            Err(RecordError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_parse_datagram_skips_blank_lines() {
        let results = parse_datagram(b"10,5\r\n\n20,7\n");
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_parse_datagram_keeps_bad_line_in_place() {
        let results = parse_datagram(b"10,5\nBADLINE\n20,7");
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(
            results[2],
            Ok(RawRecord {
                raw_timestamp: 20,
                raw_value: 7.0
            })
        );
    }

    #[test]
    fn test_invalid_utf8() {
        assert_eq!(
            parse_datagram(&[0xff, 0xfe, b',', b'1']),
            vec![Err(RecordError::InvalidUtf8)]
        );
    }
}
