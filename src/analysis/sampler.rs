//! Region-of-interest sampling
//!
//! Extracts a small, deterministic luma region from a frame that stands in
//! for the whole frame during comparison.

use crate::capture::FrameBuffer;
use crate::error::{try_reserve, AnalyzerError, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on bytes copied by full-frame sampling (4096x2160 luma).
///
/// Larger frames are truncated to their first bytes in raster order. This
/// trades comparison fidelity on oversized frames for a bounded buffer.
pub const MAX_FULL_FRAME_BYTES: usize = 4096 * 2160;

/// Which rows of a frame form the ROI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Bottom row only
    #[default]
    LastLine,
    /// Every row, capped at `MAX_FULL_FRAME_BYTES`
    FullFrame,
    /// Rows 0, height/2 and height-1, in that order
    ThreeLine,
}

impl SampleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleMode::LastLine => "last_line",
            SampleMode::FullFrame => "full_frame",
            SampleMode::ThreeLine => "three_line",
        }
    }
}

/// Produces ROI samples into an owned scratch buffer reused across frames
#[derive(Debug, Default)]
pub struct RegionSampler {
    mode: SampleMode,
    scratch: Vec<u8>,
}

impl RegionSampler {
    pub fn new(mode: SampleMode) -> Self {
        Self {
            mode,
            scratch: Vec::new(),
        }
    }

    pub fn set_mode(&mut self, mode: SampleMode) {
        self.mode = mode;
    }

    /// Sample `frame` according to the configured mode.
    ///
    /// The returned slice borrows the sampler's scratch buffer and is valid
    /// until the next call.
    pub fn sample(&mut self, frame: &FrameBuffer<'_>) -> Result<&[u8]> {
        if frame.layout.luma_step().is_none() {
            return Err(AnalyzerError::UnsupportedLayout(frame.layout));
        }

        self.scratch.clear();
        if frame.width == 0 || frame.height == 0 {
            return Ok(&self.scratch);
        }

        match self.mode {
            SampleMode::LastLine => {
                append_luma(frame, frame.height - 1, &mut self.scratch, usize::MAX)?;
            }
            SampleMode::ThreeLine => {
                for y in frame.three_line_rows() {
                    append_luma(frame, y, &mut self.scratch, usize::MAX)?;
                }
            }
            SampleMode::FullFrame => {
                for y in 0..frame.height {
                    if self.scratch.len() >= MAX_FULL_FRAME_BYTES {
                        break;
                    }
                    append_luma(frame, y, &mut self.scratch, MAX_FULL_FRAME_BYTES)?;
                }
            }
        }

        Ok(&self.scratch)
    }
}

/// Append the luma bytes of row `y` to `out`, never growing `out` past `limit`.
pub(crate) fn append_luma(frame: &FrameBuffer<'_>, y: u32, out: &mut Vec<u8>, limit: usize) -> Result<()> {
    let step = frame
        .layout
        .luma_step()
        .ok_or(AnalyzerError::UnsupportedLayout(frame.layout))?;
    let row = frame.row(y)?;
    let samples = row.len().div_ceil(step);
    let take = samples.min(limit.saturating_sub(out.len()));
    try_reserve(out, take)?;

    if step == 1 {
        out.extend_from_slice(&row[..take]);
    } else {
        out.extend(row.iter().step_by(step).take(take));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelLayout;

    fn planar(width: u32, height: u32) -> Vec<u8> {
        (0..width * height).map(|i| i as u8).collect()
    }

    #[test]
    fn last_line_planar() {
        let data = planar(4, 3);
        let frame = FrameBuffer::new(4, 3, 4, PixelLayout::PlanarLuma, &data);
        let mut sampler = RegionSampler::new(SampleMode::LastLine);
        assert_eq!(sampler.sample(&frame).unwrap(), &[8, 9, 10, 11]);
    }

    #[test]
    fn last_line_packed_takes_even_bytes() {
        // Y0 U Y1 V per pixel pair
        let data = [0, 0, 0, 0, 10, 99, 11, 98, 12, 97, 13, 96];
        let frame = FrameBuffer::new(3, 2, 6, PixelLayout::PackedLuma, &data);
        let mut sampler = RegionSampler::new(SampleMode::LastLine);
        assert_eq!(sampler.sample(&frame).unwrap(), &[11, 12, 13]);
    }

    #[test]
    fn three_line_concatenates_top_middle_bottom() {
        let data = planar(2, 5);
        let frame = FrameBuffer::new(2, 5, 2, PixelLayout::PlanarLuma, &data);
        let mut sampler = RegionSampler::new(SampleMode::ThreeLine);
        assert_eq!(sampler.sample(&frame).unwrap(), &[0, 1, 4, 5, 8, 9]);
    }

    #[test]
    fn full_frame_copies_every_row() {
        let data = [1, 2, 0, 3, 4, 0];
        let frame = FrameBuffer::new(2, 2, 3, PixelLayout::PlanarLuma, &data);
        let mut sampler = RegionSampler::new(SampleMode::FullFrame);
        assert_eq!(sampler.sample(&frame).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn full_frame_truncates_oversized_frames() {
        let width = 4096u32;
        let height = 2161u32;
        let data: Vec<u8> = (0..width * height).map(|i| (i % 251) as u8).collect();
        let frame = FrameBuffer::new(width, height, width as usize, PixelLayout::PlanarLuma, &data);
        let mut sampler = RegionSampler::new(SampleMode::FullFrame);
        let roi = sampler.sample(&frame).unwrap();
        assert_eq!(roi.len(), MAX_FULL_FRAME_BYTES);
        assert_eq!(roi, &data[..MAX_FULL_FRAME_BYTES]);
    }

    #[test]
    fn full_frame_truncates_oversized_packed_frames() {
        let width = 4096u32;
        let height = 2161u32;
        let luma: Vec<u8> = (0..width * height).map(|i| (i % 251) as u8).collect();
        let data: Vec<u8> = luma.iter().flat_map(|&y| [y, 0x80]).collect();
        let frame = FrameBuffer::new(width, height, width as usize * 2, PixelLayout::PackedLuma, &data);
        let mut sampler = RegionSampler::new(SampleMode::FullFrame);
        let roi = sampler.sample(&frame).unwrap();
        assert_eq!(roi.len(), MAX_FULL_FRAME_BYTES);
        assert_eq!(roi, &luma[..MAX_FULL_FRAME_BYTES]);
    }

    #[test]
    fn packed_quad_is_rejected() {
        let data = [0u8; 32];
        let frame = FrameBuffer::new(2, 2, 16, PixelLayout::PackedQuad, &data);
        let mut sampler = RegionSampler::new(SampleMode::LastLine);
        assert!(matches!(
            sampler.sample(&frame),
            Err(AnalyzerError::UnsupportedLayout(PixelLayout::PackedQuad))
        ));
    }

    #[test]
    fn empty_frame_gives_empty_roi() {
        let frame = FrameBuffer::new(0, 0, 0, PixelLayout::PlanarLuma, &[]);
        let mut sampler = RegionSampler::new(SampleMode::ThreeLine);
        assert!(sampler.sample(&frame).unwrap().is_empty());
    }
}
