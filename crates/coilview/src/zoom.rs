//! Zoom window computation and sub-grid extraction
//!
//! The zoom percentage scales the full extent inversely (200 halves it) around
//! the center of the full bounds. Extraction snaps to existing samples and
//! never interpolates.

use tracing::debug;

use crate::error::{Axis, Result, ViewError};
use crate::expr;
use crate::sample::{FieldSample, Window};

/// Zoom percentage that shows the full extent
pub const FULL_EXTENT: f64 = 100.0;

/// Parse a zoom percentage typed by the user
pub fn parse_zoom(text: &str) -> Result<f64> {
    let zoom = expr::evaluate(text).map_err(|source| ViewError::InvalidNumericExpression {
        input: text.to_string(),
        source,
    })?;
    if zoom <= 0.0 {
        return Err(ViewError::InvalidZoom(zoom));
    }
    Ok(zoom)
}

/// Window of the requested zoom, centered on the full bounds
pub fn zoom_window(full: &Window, zoom: f64) -> Result<Window> {
    if !(zoom.is_finite() && zoom > 0.0) {
        return Err(ViewError::InvalidZoom(zoom));
    }
    if zoom == FULL_EXTENT {
        return Ok(*full);
    }

    let (mid_z, mid_rho) = full.center();
    let new_z = full.width() * FULL_EXTENT / zoom;
    let new_rho = full.height() * FULL_EXTENT / zoom;

    Ok(Window::new(
        mid_z - 0.5 * new_z,
        mid_z + 0.5 * new_z,
        mid_rho - 0.5 * new_rho,
        mid_rho + 0.5 * new_rho,
    ))
}

/// Compute the zoom window and copy out the samples inside it
///
/// The returned window is the requested one; the sub-sample covers the
/// samples that fall within it, so its own extent may be smaller.
pub fn compute_window(sample: &FieldSample, full: &Window, zoom: f64) -> Result<(Window, FieldSample)> {
    let window = zoom_window(full, zoom)?;

    let (left, right) = index_span(&sample.z_axis(), window.z_min, window.z_max, Axis::Z)?;
    let (down, up) = index_span(&sample.rho_axis(), window.rho_min, window.rho_max, Axis::Rho)?;

    debug!(
        zoom,
        left, right, down, up, "zoom window z=[{:.4}, {:.4}] rho=[{:.4}, {:.4}]",
        window.z_min, window.z_max, window.rho_min, window.rho_max
    );

    Ok((window, sample.block(left, right, down, up)))
}

/// First index with `axis[i] >= lo` and last index with `axis[i] <= hi`
///
/// When the window falls between two samples the first index is past the
/// last one and the resulting block is empty.
fn index_span(axis: &[f64], lo: f64, hi: f64, which: Axis) -> Result<(usize, usize)> {
    let first = axis.iter().position(|&v| v >= lo);
    let last = axis.iter().rposition(|&v| v <= hi);
    match (first, last) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(ViewError::OutOfRangeWindow { axis: which, lo, hi }),
    }
}
