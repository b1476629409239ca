//! Frame input
//!
//! Borrowed frame views for the analyzer and a raw-file frame source.

pub mod frame;
pub use frame::{Frame, FrameBuffer, FrameStats, PixelLayout};

pub mod reader;
pub use reader::{FrameSource, RawFormat, RawFrameReader};
