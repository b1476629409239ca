//! fps-analyzer - frame-rate analysis core
//!
//! Detects genuinely new frames in a stream of raw video buffers and turns
//! them into a live FPS, frametime and tearing estimate.

pub mod analysis;
pub mod capture;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod sink;

pub use engine::{Analyzer, Engine, EngineState, FrameOutcome};
pub use error::{AnalyzerError, Result};
