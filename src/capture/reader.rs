//! Raw frame file source
//!
//! Slices a stream of concatenated raw frames into owned `Frame`s.

use crate::capture::frame::{Frame, FrameStats, PixelLayout};
use crate::error::{try_reserve, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read};

/// Trait for frame source implementations
pub trait FrameSource: Send {
    /// Read the next frame, `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Get read statistics
    fn stats(&self) -> FrameStats;
}

/// Raw frame file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RawFormat {
    #[default]
    Yuy2,
    I420,
    Nv12,
    Rgba,
}

impl RawFormat {
    pub fn layout(&self) -> PixelLayout {
        match self {
            RawFormat::Yuy2 => PixelLayout::PackedLuma,
            RawFormat::I420 | RawFormat::Nv12 => PixelLayout::PlanarLuma,
            RawFormat::Rgba => PixelLayout::PackedQuad,
        }
    }

    /// Plane 0 stride of a tightly packed frame
    pub fn linesize(&self, width: u32) -> usize {
        let width = width as usize;
        match self {
            RawFormat::Yuy2 => width * 2,
            RawFormat::I420 | RawFormat::Nv12 => width,
            RawFormat::Rgba => width * 4,
        }
    }

    /// Total bytes of one frame, all planes included
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let luma = self.linesize(width) * height as usize;
        match self {
            RawFormat::I420 | RawFormat::Nv12 => {
                let chroma_w = (width as usize).div_ceil(2);
                let chroma_h = (height as usize).div_ceil(2);
                luma + 2 * chroma_w * chroma_h
            }
            _ => luma,
        }
    }
}

/// Reads fixed-size raw frames from any byte stream
pub struct RawFrameReader<R> {
    inner: R,
    format: RawFormat,
    width: u32,
    height: u32,
    frame_size: usize,
    sequence: u64,
    stats: FrameStats,
}

impl<R: Read + Send> RawFrameReader<R> {
    pub fn new(inner: R, format: RawFormat, width: u32, height: u32) -> Self {
        Self {
            inner,
            format,
            width,
            height,
            frame_size: format.frame_size(width, height),
            sequence: 0,
            stats: FrameStats::default(),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

impl<R: Read + Send> FrameSource for RawFrameReader<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut data = Vec::new();
        try_reserve(&mut data, self.frame_size)?;
        data.resize(self.frame_size, 0);

        match self.inner.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("End of frame stream after {} frames", self.sequence);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let frame = Frame {
            width: self.width,
            height: self.height,
            linesize: self.format.linesize(self.width),
            layout: self.format.layout(),
            data,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.stats.record_frame(self.frame_size);
        Ok(Some(frame))
    }

    fn stats(&self) -> FrameStats {
        self.stats.clone()
    }
}
