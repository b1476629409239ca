//! Per-frame analysis
//!
//! ROI sampling, frame uniqueness and tearing classification.

pub mod sampler;
pub mod tearing;
pub mod uniqueness;

pub use sampler::{RegionSampler, SampleMode, MAX_FULL_FRAME_BYTES};
pub use tearing::{TearingDetector, TearingHistory};
pub use uniqueness::{UniquenessDetector, UniquenessMethod};

/// Count positions where `a` and `b` differ. Slices must have equal length.
pub(crate) fn count_diff_bytes(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

/// Share of differing bytes in percent; an empty region has 0% change.
pub(crate) fn diff_percent(diff: usize, size: usize) -> f64 {
    if size == 0 {
        0.0
    } else {
        100.0 * diff as f64 / size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_counting() {
        assert_eq!(count_diff_bytes(b"same", b"same"), 0);
        assert_eq!(count_diff_bytes(b"same", b"sand"), 2);
    }

    #[test]
    fn percent_of_empty_region_is_zero() {
        assert_eq!(diff_percent(0, 0), 0.0);
        assert_eq!(diff_percent(1, 1000), 0.1);
        assert_eq!(diff_percent(5, 10), 50.0);
    }
}
