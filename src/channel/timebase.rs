//! Continuous time axis from a wrapping hardware counter
//!
//! The first sample of a session is time 0. Afterwards the raw tick delta
//! is added as-is, except when the raw counter goes backwards (overflow or
//! device reset). Then the offset is rebased so the new sample lands on the
//! previous adjusted time and the axis continues from there. Adjusted time
//! is therefore never negative and never decreases, however many wraps a
//! session sees.

/// Result of normalizing one raw timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub time: i64,
    /// The raw counter went backwards on this sample
    pub wrapped: bool,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    raw: u32,
    adjusted: i64,
    offset: i64,
}

/// Per-session timestamp normalizer
#[derive(Debug, Default)]
pub struct Timebase {
    last: Option<Anchor>,
}

impl Timebase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adjust(&mut self, raw: u32) -> Adjustment {
        let raw_time = i64::from(raw);

        let (offset, wrapped) = match self.last {
            None => (-raw_time, false),
            Some(prev) if raw < prev.raw => (prev.adjusted - raw_time, true),
            Some(prev) => (prev.offset, false),
        };

        let time = raw_time + offset;
        self.last = Some(Anchor {
            raw,
            adjusted: time,
            offset,
        });

        Adjustment { time, wrapped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(raw: &[u32]) -> Vec<i64> {
        let mut tb = Timebase::new();
        raw.iter().map(|&r| tb.adjust(r).time).collect()
    }

    #[test]
    fn test_first_sample_is_zero() {
        assert_eq!(run(&[987_654]), vec![0]);
    }

    #[test]
    fn test_monotonic_is_relative_to_first() {
        let raw = [1000, 1010, 1010, 1500, 90_000];
        let expected: Vec<i64> = raw.iter().map(|&r| r as i64 - 1000).collect();
        assert_eq!(run(&raw), expected);
    }

    #[test]
    fn test_single_wrap() {
        let mut tb = Timebase::new();
        let out: Vec<Adjustment> = [100, 200, 50, 150].iter().map(|&r| tb.adjust(r)).collect();

        let times: Vec<i64> = out.iter().map(|a| a.time).collect();
        assert_eq!(times, vec![0, 100, 100, 200]);
        assert_eq!(
            out.iter().map(|a| a.wrapped).collect::<Vec<_>>(),
            vec![false, false, true, false]
        );
    }

    #[test]
    fn test_repeated_wraps_keep_advancing() {
        assert_eq!(
            run(&[100, 200, 50, 150, 10, 40]),
            vec![0, 100, 100, 200, 200, 230]
        );
    }

    #[test]
    fn test_u32_overflow() {
        assert_eq!(
            run(&[u32::MAX - 10, u32::MAX, 5, 25]),
            vec![0, 10, 10, 30]
        );
    }

    proptest! {
        #[test]
        fn prop_never_negative_or_decreasing(
            raw in proptest::collection::vec(any::<u32>(), 1..200)
        ) {
            let times = run(&raw);
            prop_assert_eq!(times[0], 0);
            for pair in times.windows(2) {
                prop_assert!(pair[0] >= 0);
                prop_assert!(pair[1] >= pair[0]);
            }
        }

        #[test]
        fn prop_sorted_input_is_plain_offset(
            mut raw in proptest::collection::vec(any::<u32>(), 1..200)
        ) {
            raw.sort_unstable();
            let times = run(&raw);
            for (t, r) in times.iter().zip(&raw) {
                prop_assert_eq!(*t, *r as i64 - raw[0] as i64);
            }
        }
    }
}
