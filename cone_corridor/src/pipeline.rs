// THEORY:
// The `pipeline` module is the top-level API of the detection engine. It wires
// the five core stages together behind a single `CorridorDetector` and turns
// their outputs into a `CorridorReport`:
//
//   RGB frame -> segment -> refine -> extract centers -> partition -> fit x2
//
// Every tunable lives in `DetectorConfig`; nothing in the stages is hard-coded.
// A detector holds no per-image state, so one instance can be shared across
// threads and used for any number of frames.

use crate::core_modules::blob_extractor::blob_extractor;
use crate::core_modules::center_point::CenterPoint;
use crate::core_modules::color_segmenter;
use crate::core_modules::hsv::hsv::HUE_MAX;
use crate::core_modules::line_fitter::{self, BoundaryLine, LineExtent};
use crate::core_modules::mask_refiner;
use crate::core_modules::side_partitioner::{MidpointSplit, PartitionStrategy, SideGroups};
use crate::error::{FitError, PipelineError};
use crate::render;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use crate::render::LineStyle;

/// Inclusive HSV threshold box, channels in `[hue, saturation, value]` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvBounds {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl Default for HsvBounds {
    /// Traffic-cone orange.
    fn default() -> Self {
        Self {
            lower: [10, 100, 100],
            upper: [25, 255, 255],
        }
    }
}

/// Configuration for the `CorridorDetector`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub hsv_bounds: HsvBounds,
    /// Side of the square element used for opening. Odd, at least 1.
    pub open_kernel_size: u8,
    /// Side of the square element used for closing. Odd, at least 1.
    pub close_kernel_size: u8,
    /// Blobs must have strictly more pixels than this to count as markers.
    pub min_area: u64,
    pub line_extent: LineExtent,
    pub line_style: LineStyle,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            hsv_bounds: HsvBounds::default(),
            open_kernel_size: 3,
            close_kernel_size: 5,
            min_area: 50,
            line_extent: LineExtent::FullWidth,
            line_style: LineStyle::default(),
        }
    }
}

impl DetectorConfig {
    /// Loads a JSON configuration. Missing fields take their default values.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, size) in [
            ("open_kernel_size", self.open_kernel_size),
            ("close_kernel_size", self.close_kernel_size),
        ] {
            if size == 0 || size % 2 == 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be an odd number of at least 1, got {size}"
                )));
            }
        }

        let HsvBounds { lower, upper } = self.hsv_bounds;
        if lower[0] > HUE_MAX || upper[0] > HUE_MAX {
            return Err(PipelineError::InvalidConfig(format!(
                "hue thresholds must not exceed {HUE_MAX}, got {} and {}",
                lower[0], upper[0]
            )));
        }
        for (channel, name) in ["hue", "saturation", "value"].iter().enumerate() {
            if lower[channel] > upper[channel] {
                return Err(PipelineError::InvalidConfig(format!(
                    "lower {name} {} is above upper {name} {}; wrapping bands are not supported",
                    lower[channel], upper[channel]
                )));
            }
        }

        if self.line_style.thickness == 0 {
            return Err(PipelineError::InvalidConfig(
                "line thickness must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// What became of one side of the corridor.
#[derive(Debug, Clone, PartialEq)]
pub enum SideOutcome {
    /// A boundary line was fitted.
    Line(BoundaryLine),
    /// Fewer than two markers ended up on this side.
    InsufficientMarkers { found: usize },
    /// All markers on this side share one x-coordinate.
    Degenerate { x: u32, points: usize },
}

impl SideOutcome {
    pub fn line(&self) -> Option<&BoundaryLine> {
        match self {
            SideOutcome::Line(line) => Some(line),
            _ => None,
        }
    }
}

impl fmt::Display for SideOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideOutcome::Line(line) => write!(
                f,
                "line ({}, {}) -> ({}, {}), slope {:.3}",
                line.start.0, line.start.1, line.end.0, line.end.1, line.fit.slope
            ),
            SideOutcome::InsufficientMarkers { found } => {
                write!(f, "no line, {found} marker(s) found")
            }
            SideOutcome::Degenerate { x, points } => {
                write!(f, "no line, {points} markers all at x = {x}")
            }
        }
    }
}

/// The result of running the detector over a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CorridorReport {
    pub image_width: u32,
    pub image_height: u32,
    /// Marker centroids in extraction order.
    pub centers: Vec<CenterPoint>,
    /// The same centroids after partitioning.
    pub groups: SideGroups,
    pub left: SideOutcome,
    pub right: SideOutcome,
}

impl CorridorReport {
    /// Zero, one or two lines, left first.
    pub fn boundary_lines(&self) -> Vec<BoundaryLine> {
        [&self.left, &self.right]
            .into_iter()
            .filter_map(SideOutcome::line)
            .copied()
            .collect()
    }
}

/// The main, top-level struct for the detection engine.
#[derive(Clone)]
pub struct CorridorDetector {
    config: DetectorConfig,
    partitioner: Arc<dyn PartitionStrategy>,
}

impl fmt::Debug for CorridorDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorridorDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CorridorDetector {
    /// Validates `config` and builds a detector using the midpoint split.
    pub fn new(config: DetectorConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            partitioner: Arc::new(MidpointSplit),
        })
    }

    /// Replaces the left/right partitioning strategy.
    pub fn with_partitioner(mut self, partitioner: impl PartitionStrategy + 'static) -> Self {
        self.partitioner = Arc::new(partitioner);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Runs every core stage over `image`.
    pub fn detect(&self, image: &RgbImage) -> CorridorReport {
        let (image_width, image_height) = image.dimensions();
        let config = &self.config;

        // --- 1. Color Segmentation ---
        let mask = color_segmenter::segment(image, config.hsv_bounds.lower, config.hsv_bounds.upper);
        log::debug!(
            "segmentation: {} of {} pixels in band",
            color_segmenter::foreground_count(&mask),
            image_width as u64 * image_height as u64
        );

        // --- 2. Mask Refinement ---
        let mask = mask_refiner::refine(mask, config.open_kernel_size, config.close_kernel_size);

        // --- 3. Blob Extraction ---
        let centers = blob_extractor::extract_centers(&mask, config.min_area);

        // --- 4. Side Partitioning ---
        let groups = self.partitioner.partition(centers.clone());
        log::debug!(
            "partition: {} left, {} right",
            groups.left.len(),
            groups.right.len()
        );

        // --- 5. Line Fitting ---
        let left = self.fit_side("left", &groups.left, image_width, image_height);
        let right = self.fit_side("right", &groups.right, image_width, image_height);

        CorridorReport {
            image_width,
            image_height,
            centers,
            groups,
            left,
            right,
        }
    }

    fn fit_side(&self, side: &str, group: &[CenterPoint], width: u32, height: u32) -> SideOutcome {
        match line_fitter::fit_and_clip_with(group, width, height, self.config.line_extent) {
            Ok(Some(line)) => SideOutcome::Line(line),
            Ok(None) => {
                log::debug!("{side} side: {} marker(s), need at least 2", group.len());
                SideOutcome::InsufficientMarkers { found: group.len() }
            }
            Err(err) => {
                log::warn!("{side} side rejected: {err}");
                let FitError::DegenerateFit { x, points } = err;
                SideOutcome::Degenerate { x, points }
            }
        }
    }

    /// Decodes `path` and runs the detector over it.
    pub fn detect_path(&self, path: &Path) -> Result<(RgbImage, CorridorReport), PipelineError> {
        let image = render::load(path)?;
        let report = self.detect(&image);
        Ok((image, report))
    }

    /// Paints the report's lines over a copy of `image`.
    pub fn annotate(&self, image: &RgbImage, report: &CorridorReport) -> RgbImage {
        render::draw_boundaries(image, &report.boundary_lines(), &self.config.line_style)
    }

    /// Load, detect, annotate and save. Nothing is written if decoding fails.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<CorridorReport, PipelineError> {
        let (image, report) = self.detect_path(input)?;
        let annotated = self.annotate(&image, &report);
        render::save(&annotated, output)?;

        log::info!(
            "{}: {} markers, {} boundary line(s) -> {}",
            input.display(),
            report.centers.len(),
            report.boundary_lines().len(),
            output.display()
        );
        Ok(report)
    }
}
