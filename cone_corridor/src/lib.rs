// THEORY:
// This file is the main entry point for the `cone_corridor` library crate. It
// exposes the `CorridorDetector` and its configuration and report types as the
// high-level interface, plus the `ParallelPipeline` for batches of independent
// frames. The individual stages live in `core_modules` and stay public so that
// callers can run or test any one of them in isolation.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod render;

pub use error::{FitError, PipelineError};
pub use pipeline::{CorridorDetector, CorridorReport, DetectorConfig, HsvBounds, LineStyle, SideOutcome};
