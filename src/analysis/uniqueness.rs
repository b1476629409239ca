//! Frame uniqueness detection
//!
//! Decides whether a ROI belongs to a genuinely new frame or to a repeated
//! buffer. The first ROI, and any ROI whose size differs from the cached
//! one, is always unique.

use crate::analysis::{count_diff_bytes, diff_percent};
use crate::error::{try_reserve, Result};
use flate2::Crc;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

const HASH_SEED: u64 = 0x123456789ABCDEF0;

/// Comparison strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UniquenessMethod {
    /// Percentage of differing bytes against a sensitivity threshold
    #[default]
    ByteDiff,
    /// CRC-32 of the ROI; any change is unique
    Checksum,
    /// xxh64 of the ROI; any change is unique
    Hash,
}

impl UniquenessMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniquenessMethod::ByteDiff => "byte_diff",
            UniquenessMethod::Checksum => "checksum",
            UniquenessMethod::Hash => "hash",
        }
    }
}

/// Digest of a previous ROI together with its length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Digest<T> {
    len: usize,
    value: T,
}

/// Per-strategy comparison state
#[derive(Debug)]
enum Comparison {
    ByteDiff { previous: Option<Vec<u8>> },
    Checksum { previous: Option<Digest<u32>> },
    Hash { previous: Option<Digest<u64>> },
}

impl Comparison {
    fn empty(method: UniquenessMethod) -> Self {
        match method {
            UniquenessMethod::ByteDiff => Comparison::ByteDiff { previous: None },
            UniquenessMethod::Checksum => Comparison::Checksum { previous: None },
            UniquenessMethod::Hash => Comparison::Hash { previous: None },
        }
    }
}

/// Compares each ROI against the previous one
#[derive(Debug)]
pub struct UniquenessDetector {
    method: UniquenessMethod,
    sensitivity_percent: f64,
    state: Comparison,
}

impl UniquenessDetector {
    pub fn new(method: UniquenessMethod, sensitivity_percent: f64) -> Self {
        Self {
            method,
            sensitivity_percent,
            state: Comparison::empty(method),
        }
    }

    /// Change the byte-diff threshold; cached state is kept.
    pub fn set_sensitivity(&mut self, sensitivity_percent: f64) {
        self.sensitivity_percent = sensitivity_percent;
    }

    /// Switch strategy. The next ROI reseeds the new strategy.
    pub fn set_method(&mut self, method: UniquenessMethod) {
        if method != self.method {
            self.method = method;
            self.state = Comparison::empty(method);
        }
    }

    /// Whether a previous ROI is cached
    pub fn is_seeded(&self) -> bool {
        match &self.state {
            Comparison::ByteDiff { previous } => previous.is_some(),
            Comparison::Checksum { previous } => previous.is_some(),
            Comparison::Hash { previous } => previous.is_some(),
        }
    }

    /// Observe the current ROI and report whether it is a new unique frame.
    ///
    /// On error the cached state is left as it was.
    pub fn observe(&mut self, roi: &[u8]) -> Result<bool> {
        let threshold = self.sensitivity_percent;
        match &mut self.state {
            Comparison::ByteDiff { previous } => {
                if let Some(prev) = previous.as_mut().filter(|p| p.len() == roi.len()) {
                    let diff = count_diff_bytes(prev, roi);
                    let unique = diff_percent(diff, roi.len()) >= threshold;
                    prev.copy_from_slice(roi);
                    return Ok(unique);
                }
                let mut fresh = Vec::new();
                try_reserve(&mut fresh, roi.len())?;
                fresh.extend_from_slice(roi);
                *previous = Some(fresh);
                Ok(true)
            }
            Comparison::Checksum { previous } => {
                let mut crc = Crc::new();
                crc.update(roi);
                Ok(replace_digest(previous, roi.len(), crc.sum()))
            }
            Comparison::Hash { previous } => {
                Ok(replace_digest(previous, roi.len(), xxh64(roi, HASH_SEED)))
            }
        }
    }
}

/// Store the new digest and report whether it differs from the old one.
fn replace_digest<T: PartialEq + Copy>(previous: &mut Option<Digest<T>>, len: usize, value: T) -> bool {
    let current = Digest { len, value };
    let unique = *previous != Some(current);
    *previous = Some(current);
    unique
}
