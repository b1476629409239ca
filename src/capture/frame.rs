//! Frame data structures
//!
//! `FrameBuffer` is the borrowed view handed to the analyzer for a single
//! call; `Frame` is the owned buffer a frame source produces.

use crate::error::{AnalyzerError, Result};
use std::fmt;

/// Pixel layout of the first plane of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Packed 4:2:2 with luma in the even byte (YUY2/YUYV/YVYU)
    PackedLuma,
    /// Planar or semi-planar with the luma plane first (I420, NV12, I444)
    PlanarLuma,
    /// Packed four bytes per pixel (RGBA/BGRA/XRGB)
    PackedQuad,
}

impl PixelLayout {
    /// Distance in bytes between consecutive luma samples of a row,
    /// or `None` when the layout has no directly addressable luma.
    pub fn luma_step(&self) -> Option<usize> {
        match self {
            PixelLayout::PackedLuma => Some(2),
            PixelLayout::PlanarLuma => Some(1),
            PixelLayout::PackedQuad => None,
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelLayout::PackedLuma => write!(f, "packed-luma"),
            PixelLayout::PlanarLuma => write!(f, "planar-luma"),
            PixelLayout::PackedQuad => write!(f, "packed-quad"),
        }
    }
}

/// Borrowed view of a frame's first plane, valid for one analyzer call
#[derive(Debug, Clone, Copy)]
pub struct FrameBuffer<'a> {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Bytes per row of plane 0, including padding
    pub linesize: usize,

    /// Pixel layout tag
    pub layout: PixelLayout,

    /// Plane 0 bytes
    pub data: &'a [u8],
}

impl<'a> FrameBuffer<'a> {
    pub fn new(width: u32, height: u32, linesize: usize, layout: PixelLayout, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            linesize,
            layout,
            data,
        }
    }

    /// Raw bytes of row `y` covering `width` pixels, still interleaved for
    /// packed layouts.
    pub fn row(&self, y: u32) -> Result<&'a [u8]> {
        let step = self
            .layout
            .luma_step()
            .ok_or(AnalyzerError::UnsupportedLayout(self.layout))?;
        let row_bytes = (self.width as usize).saturating_mul(step).min(self.linesize);
        let end = (y as usize)
            .checked_mul(self.linesize)
            .and_then(|start| start.checked_add(row_bytes))
            .unwrap_or(usize::MAX);
        if end > self.data.len() {
            return Err(AnalyzerError::FrameTooShort {
                needed: end,
                actual: self.data.len(),
            });
        }
        Ok(&self.data[end - row_bytes..end])
    }

    /// Rows sampled by the three-line extraction: top, middle, bottom
    pub fn three_line_rows(&self) -> [u32; 3] {
        let last = self.height.saturating_sub(1);
        [0, self.height / 2, last]
    }
}

/// Owned frame produced by a frame source
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Bytes per row of plane 0
    pub linesize: usize,

    /// Pixel layout tag
    pub layout: PixelLayout,

    /// Raw frame bytes, plane 0 first
    pub data: Vec<u8>,

    /// Frame sequence number
    pub sequence: u64,
}

impl Frame {
    /// Borrow this frame for a single analyzer call
    pub fn as_buffer(&self) -> FrameBuffer<'_> {
        FrameBuffer::new(self.width, self.height, self.linesize, self.layout, &self.data)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame({}x{} {}, {} bytes, seq={})",
            self.width,
            self.height,
            self.layout,
            self.data.len(),
            self.sequence
        )
    }
}

/// Frame statistics for monitoring
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    /// Total frames read
    pub total_frames: u64,

    /// Total bytes read
    pub total_bytes: u64,
}

impl FrameStats {
    /// Record a frame read
    pub fn record_frame(&mut self, bytes: usize) {
        self.total_frames += 1;
        self.total_bytes += bytes as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_respects_linesize_padding() {
        // 2x2 planar with 4-byte stride
        let data = [1, 2, 0, 0, 3, 4, 0, 0];
        let frame = FrameBuffer::new(2, 2, 4, PixelLayout::PlanarLuma, &data);
        assert_eq!(frame.row(0).unwrap(), &[1, 2]);
        assert_eq!(frame.row(1).unwrap(), &[3, 4]);
    }

    #[test]
    fn row_rejects_packed_quad() {
        let data = [0u8; 16];
        let frame = FrameBuffer::new(2, 2, 8, PixelLayout::PackedQuad, &data);
        assert!(matches!(
            frame.row(0),
            Err(AnalyzerError::UnsupportedLayout(PixelLayout::PackedQuad))
        ));
    }

    #[test]
    fn row_reports_short_buffer() {
        let data = [0u8; 6];
        let frame = FrameBuffer::new(4, 2, 4, PixelLayout::PlanarLuma, &data);
        assert!(frame.row(0).is_ok());
        assert!(matches!(
            frame.row(1),
            Err(AnalyzerError::FrameTooShort { needed: 8, actual: 6 })
        ));
    }

    #[test]
    fn row_with_overflowing_linesize_is_too_short() {
        let data = [0u8; 4];
        let frame = FrameBuffer::new(1, 3, usize::MAX / 2 + 1, PixelLayout::PlanarLuma, &data);
        assert!(frame.row(0).is_ok());
        assert!(matches!(
            frame.row(2),
            Err(AnalyzerError::FrameTooShort { needed: usize::MAX, actual: 4 })
        ));
    }

    #[test]
    fn three_line_rows_for_odd_height() {
        let data = [0u8; 5];
        let frame = FrameBuffer::new(1, 5, 1, PixelLayout::PlanarLuma, &data);
        assert_eq!(frame.three_line_rows(), [0, 2, 4]);
    }
}
