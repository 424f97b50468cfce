// THEORY:
// Errors are split by how far they travel. A `FitError` never leaves a single
// side of the corridor: the pipeline turns it into a `SideOutcome` and keeps
// going with the other side. A `PipelineError` aborts the image it belongs to.

use std::path::PathBuf;

/// Conditions under which a side group cannot be turned into a boundary line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FitError {
    /// Every point in the group shares one x-coordinate, so y cannot be
    /// expressed as a function of x.
    #[error("cannot fit a line through {points} markers that all sit at x = {x}")]
    DegenerateFit { x: u32, points: usize },
}

/// Errors that abort processing of a single image.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input could not be opened or decoded.
    #[error("failed to decode input image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The annotated image could not be encoded or written.
    #[error("failed to write output image {}: {source}", path.display())]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A batch worker went away before it could answer.
    #[error("worker pool unavailable: {0}")]
    WorkerUnavailable(String),
}
