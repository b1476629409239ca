//! Tearing detection
//!
//! Samples the top, middle and bottom rows of each frame. A frame whose rows
//! changed inconsistently (some but not all) was most likely captured
//! mid-scan-out. A short verdict history filters single-frame noise.

use crate::analysis::sampler::append_luma;
use crate::analysis::{count_diff_bytes, diff_percent};
use crate::capture::FrameBuffer;
use crate::error::{try_reserve, AnalyzerError, Result};
use log::trace;

/// Number of recent verdicts kept for hysteresis
pub const HISTORY_LEN: usize = 5;

/// Torn verdicts within the history needed to raise the warning
pub const WARNING_THRESHOLD: usize = 2;

/// Fixed circular history of per-frame torn verdicts
#[derive(Debug, Default, Clone)]
pub struct TearingHistory {
    verdicts: [bool; HISTORY_LEN],
    cursor: usize,
}

impl TearingHistory {
    /// Push a verdict and return the resulting warning flag
    pub fn push(&mut self, torn: bool) -> bool {
        self.verdicts[self.cursor] = torn;
        self.cursor = (self.cursor + 1) % HISTORY_LEN;
        self.is_flagged()
    }

    pub fn torn_count(&self) -> usize {
        self.verdicts.iter().filter(|&&torn| torn).count()
    }

    pub fn is_flagged(&self) -> bool {
        self.torn_count() >= WARNING_THRESHOLD
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Classifies frames as torn from three sampled rows
#[derive(Debug, Default)]
pub struct TearingDetector {
    enabled: bool,
    sensitivity_percent: f64,
    current: [Vec<u8>; 3],
    previous: Option<[Vec<u8>; 3]>,
    history: TearingHistory,
}

impl TearingDetector {
    pub fn new(enabled: bool, sensitivity_percent: f64) -> Self {
        Self {
            enabled,
            sensitivity_percent,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable detection. Disabling releases all sampled rows.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.current = Default::default();
            self.previous = None;
            self.history.clear();
        }
        self.enabled = enabled;
    }

    pub fn set_sensitivity(&mut self, sensitivity_percent: f64) {
        self.sensitivity_percent = sensitivity_percent;
    }

    /// Current hysteresis-filtered warning
    pub fn is_flagged(&self) -> bool {
        self.enabled && self.history.is_flagged()
    }

    /// Observe a frame and return the warning flag after this frame.
    pub fn observe(&mut self, frame: &FrameBuffer<'_>) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }
        if frame.layout.luma_step().is_none() {
            return Err(AnalyzerError::UnsupportedLayout(frame.layout));
        }
        if frame.width == 0 || frame.height == 0 {
            return Ok(self.history.is_flagged());
        }

        for (line, y) in self.current.iter_mut().zip(frame.three_line_rows()) {
            line.clear();
            append_luma(frame, y, line, usize::MAX)?;
        }

        let threshold = self.sensitivity_percent;
        let current = &mut self.current;
        let previous = self
            .previous
            .as_mut()
            .filter(|prev| prev.iter().zip(current.iter()).all(|(p, c)| p.len() == c.len()));

        let Some(previous) = previous else {
            // verdicts from another geometry do not carry over
            self.previous = Some(self.seed()?);
            self.history.clear();
            return Ok(self.history.push(false));
        };

        let mut changed = [false; 3];
        for (i, (prev, cur)) in previous.iter_mut().zip(current.iter_mut()).enumerate() {
            let diff = count_diff_bytes(prev, cur);
            changed[i] = diff_percent(diff, cur.len()) >= threshold;
            std::mem::swap(prev, cur);
        }

        let torn = changed.iter().any(|&c| c) && !changed.iter().all(|&c| c);
        if torn {
            trace!("Torn frame: row changes {:?}", changed);
        }
        Ok(self.history.push(torn))
    }

    /// Copy the current rows into freshly allocated storage
    fn seed(&self) -> Result<[Vec<u8>; 3]> {
        let mut seeded: [Vec<u8>; 3] = Default::default();
        for (dst, src) in seeded.iter_mut().zip(self.current.iter()) {
            try_reserve(dst, src.len())?;
            dst.extend_from_slice(src);
        }
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelLayout;

    const W: u32 = 10;
    const H: u32 = 5;

    /// Planar frame with each of the sampled rows (0, 2, 4) filled with its own value
    fn frame_with_rows(top: u8, mid: u8, bottom: u8) -> Vec<u8> {
        let mut data = vec![0u8; (W * H) as usize];
        for (row, value) in [(0usize, top), (2, mid), (4, bottom)] {
            let start = row * W as usize;
            data[start..start + W as usize].fill(value);
        }
        data
    }

    fn observe(detector: &mut TearingDetector, data: &[u8]) -> bool {
        let frame = FrameBuffer::new(W, H, W as usize, PixelLayout::PlanarLuma, data);
        detector.observe(&frame).unwrap()
    }

    #[test]
    fn history_needs_two_of_five() {
        let mut history = TearingHistory::default();
        let flags: Vec<bool> = [true, false, false, true, true]
            .iter()
            .map(|&torn| history.push(torn))
            .collect();
        assert_eq!(flags, vec![false, false, false, true, true]);
    }

    #[test]
    fn isolated_torn_verdict_never_warns() {
        let mut history = TearingHistory::default();
        for torn in [false, false, true, false, false, false, false, false, false] {
            assert!(!history.push(torn));
        }
    }

    #[test]
    fn old_verdicts_fall_out_of_history() {
        let mut history = TearingHistory::default();
        history.push(true);
        assert!(history.push(true));
        for _ in 0..3 {
            assert!(history.push(false));
        }
        // first torn verdict overwritten
        assert!(!history.push(false));
    }

    #[test]
    fn disabled_detector_reports_nothing() {
        let mut detector = TearingDetector::new(false, 1.0);
        assert!(!observe(&mut detector, &frame_with_rows(1, 2, 3)));
        assert!(!observe(&mut detector, &frame_with_rows(9, 2, 3)));
        assert!(detector.previous.is_none());
        assert!(detector.current.iter().all(|line| line.capacity() == 0));
    }

    #[test]
    fn first_frame_seeds_and_reports_not_torn() {
        let mut detector = TearingDetector::new(true, 1.0);
        assert!(!observe(&mut detector, &frame_with_rows(1, 2, 3)));
        assert!(detector.previous.is_some());
    }

    #[test]
    fn partial_updates_raise_warning() {
        let mut detector = TearingDetector::new(true, 1.0);
        observe(&mut detector, &frame_with_rows(0, 0, 0));
        // top changed only
        assert!(!observe(&mut detector, &frame_with_rows(1, 0, 0)));
        // top and middle changed, bottom did not
        assert!(observe(&mut detector, &frame_with_rows(2, 1, 0)));
    }

    #[test]
    fn full_updates_are_not_torn() {
        let mut detector = TearingDetector::new(true, 1.0);
        observe(&mut detector, &frame_with_rows(0, 0, 0));
        for value in 1..10u8 {
            assert!(!observe(&mut detector, &frame_with_rows(value, value, value)));
        }
        // static frames are not torn either
        for _ in 0..5 {
            assert!(!observe(&mut detector, &frame_with_rows(9, 9, 9)));
        }
    }

    #[test]
    fn width_change_reseeds() {
        let mut detector = TearingDetector::new(true, 1.0);
        observe(&mut detector, &frame_with_rows(0, 0, 0));
        let wide = vec![5u8; 20 * H as usize];
        let frame = FrameBuffer::new(20, H, 20, PixelLayout::PlanarLuma, &wide);
        assert!(!detector.observe(&frame).unwrap());
        assert_eq!(detector.previous.as_ref().unwrap()[0].len(), 20);
    }

    #[test]
    fn width_change_drops_stale_verdicts() {
        let mut detector = TearingDetector::new(true, 1.0);
        observe(&mut detector, &frame_with_rows(0, 0, 0));
        observe(&mut detector, &frame_with_rows(1, 0, 0));
        assert!(observe(&mut detector, &frame_with_rows(2, 1, 0)));

        let wide = |fill: u8| vec![fill; 20 * H as usize];
        let first = wide(5);
        assert!(!detector.observe(&FrameBuffer::new(20, H, 20, PixelLayout::PlanarLuma, &first)).unwrap());
        assert_eq!(detector.history.torn_count(), 0);

        // a clean full update right after the reseed must not resurrect the warning
        let second = wide(6);
        assert!(!detector.observe(&FrameBuffer::new(20, H, 20, PixelLayout::PlanarLuma, &second)).unwrap());
    }

    #[test]
    fn disabling_releases_state() {
        let mut detector = TearingDetector::new(true, 1.0);
        observe(&mut detector, &frame_with_rows(0, 0, 0));
        observe(&mut detector, &frame_with_rows(1, 0, 0));
        observe(&mut detector, &frame_with_rows(2, 0, 0));
        assert!(detector.is_flagged());

        detector.set_enabled(false);
        assert!(!detector.is_flagged());
        assert!(detector.previous.is_none());
    }
}
