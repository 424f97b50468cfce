// THEORY:
// The Line Fitter is the geometric layer. Each side group is reduced to a
// straight line y = slope * x + intercept by ordinary least squares (minimising
// vertical residuals), and the line is then evaluated at the ends of the
// requested horizontal extent and clamped into the frame.
//
// Outcomes for a group:
// - fewer than 2 points: `Ok(None)`. Not an error, that side just has no line.
// - all points on one x: `Err(FitError::DegenerateFit)`. The line would be
//   vertical and y(x) is undefined, so the side is rejected and reported.
// - otherwise: `Ok(Some(line))`.
//
// Endpoint rows are rounded to the nearest pixel before clamping, not truncated,
// so a fitted y of 10.67 lands on row 11.
//
// The sums are taken about the mean so integer inputs give exact slopes for the
// common small cases, and a zero x-variance test is an exact equality.

use crate::core_modules::center_point::CenterPoint;
use crate::error::FitError;
use serde::{Deserialize, Serialize};

/// Horizontal span a boundary line is drawn over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineExtent {
    /// From x = 0 to x = image width, regardless of where the markers are.
    #[default]
    FullWidth,
    /// From the smallest to the largest marker x in the group.
    MarkerSpan,
}

/// Slope and intercept of a fitted line y = slope * x + intercept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    /// Least-squares fit of y on x. See the module notes for the outcomes.
    pub fn least_squares(points: &[CenterPoint]) -> Result<Option<Self>, FitError> {
        if points.len() < 2 {
            return Ok(None);
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| f64::from(p.x)).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| f64::from(p.y)).sum::<f64>() / n;

        let (covariance, variance) = points.iter().fold((0.0, 0.0), |(cov, var), p| {
            let dx = f64::from(p.x) - mean_x;
            let dy = f64::from(p.y) - mean_y;
            (cov + dx * dy, var + dx * dx)
        });

        if variance == 0.0 {
            return Err(FitError::DegenerateFit {
                x: points[0].x,
                points: points.len(),
            });
        }

        let slope = covariance / variance;
        Ok(Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        }))
    }

    pub fn y_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// A straight boundary with its endpoints inside the frame's vertical bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryLine {
    pub start: (u32, u32),
    pub end: (u32, u32),
    pub fit: LineFit,
}

impl BoundaryLine {
    /// The same line with both endpoint y values clamped into
    /// `[0, image_height - 1]`. Clamping an already clamped line is a no-op.
    pub fn clamped(&self, image_height: u32) -> Self {
        let max_y = image_height.saturating_sub(1);
        Self {
            start: (self.start.0, self.start.1.min(max_y)),
            end: (self.end.0, self.end.1.min(max_y)),
            fit: self.fit,
        }
    }
}

fn clamp_row(y: f64, image_height: u32) -> u32 {
    let max_y = f64::from(image_height.saturating_sub(1));
    y.round().clamp(0.0, max_y) as u32
}

/// Fits `group` and spans the result across the full image width.
pub fn fit_and_clip(
    group: &[CenterPoint],
    image_width: u32,
    image_height: u32,
) -> Result<Option<BoundaryLine>, FitError> {
    fit_and_clip_with(group, image_width, image_height, LineExtent::FullWidth)
}

/// Fits `group` and spans the result over `extent`.
pub fn fit_and_clip_with(
    group: &[CenterPoint],
    image_width: u32,
    image_height: u32,
    extent: LineExtent,
) -> Result<Option<BoundaryLine>, FitError> {
    let Some(fit) = LineFit::least_squares(group)? else {
        return Ok(None);
    };

    let (x_start, x_end) = match extent {
        LineExtent::FullWidth => (0, image_width),
        LineExtent::MarkerSpan => {
            let xs = group.iter().map(|p| p.x);
            // `least_squares` already rejected groups of fewer than 2 points.
            (xs.clone().min().unwrap_or(0), xs.max().unwrap_or(image_width))
        }
    };

    Ok(Some(BoundaryLine {
        start: (x_start, clamp_row(fit.y_at(f64::from(x_start)), image_height)),
        end: (x_end, clamp_row(fit.y_at(f64::from(x_end)), image_height)),
        fit,
    }))
}
