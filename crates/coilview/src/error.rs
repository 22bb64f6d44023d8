//! Error taxonomy for the windowing / color-scaling pipeline
//!
//! Every variant is recoverable: the caller reports it and keeps the
//! previously displayed state.

use std::path::PathBuf;
use thiserror::Error;

use crate::expr::ExprError;

#[derive(Debug, Error)]
pub enum ViewError {
    /// Zoom request produced a window with no matching sample index
    #[error("zoom window [{lo:.4}, {hi:.4}] on the {axis} axis matches no sample")]
    OutOfRangeWindow { axis: Axis, lo: f64, hi: f64 },

    /// User supplied max <= min
    #[error("max. value ({max}) must be greater than min. value ({min})")]
    InvalidRangeOrder { min: String, max: String },

    /// Text that does not evaluate to a finite real number
    #[error("'{input}' is not a valid number: {source}")]
    InvalidNumericExpression {
        input: String,
        #[source]
        source: ExprError,
    },

    #[error("zoom must be a positive real, got {0}")]
    InvalidZoom(f64),

    /// Extraction produced zero rows or columns
    #[error("window contains no samples ({rows}x{cols})")]
    EmptyWindow { rows: usize, cols: usize },

    #[error("field arrays have mismatched shapes: {0}")]
    ShapeMismatch(String),

    #[error("unknown colormap '{0}'")]
    UnknownColormap(String),

    #[error("failed to export {path:?}: {reason}")]
    ExportFailure { path: PathBuf, reason: ExportReason },
}

#[derive(Debug, Error)]
pub enum ExportReason {
    #[error("unsupported file extension '{0}' (use png, jpg, pdf or svg)")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// Chart drawing failed (backend or font)
    #[error("drawing failed: {0}")]
    Plot(String),
}

/// Grid axis, used in error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Z,
    Rho,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Z => write!(f, "z"),
            Axis::Rho => write!(f, "rho"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;
