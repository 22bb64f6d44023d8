//! Field sample types handed over by the simulation
//!
//! The grids follow an `ij` meshgrid layout: axis 0 (rows) runs along z,
//! axis 1 (columns) runs along rho.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};

/// Sampled field magnitude on a 2D axisymmetric grid
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSample {
    /// Axial coordinate of every sample (m)
    pub z: DMatrix<f64>,
    /// Radial coordinate of every sample (m)
    pub rho: DMatrix<f64>,
    /// |B| at every sample (T)
    pub norm: DMatrix<f64>,
}

impl FieldSample {
    /// Build a sample from full coordinate grids, checking that all three share a shape
    pub fn new(z: DMatrix<f64>, rho: DMatrix<f64>, norm: DMatrix<f64>) -> Result<Self> {
        if z.shape() != rho.shape() || z.shape() != norm.shape() {
            return Err(ViewError::ShapeMismatch(format!(
                "z {:?}, rho {:?}, norm {:?}",
                z.shape(),
                rho.shape(),
                norm.shape()
            )));
        }
        Ok(Self { z, rho, norm })
    }

    /// Build a sample from 1D axes and a row-per-z magnitude table
    pub fn from_axes(z_axis: &[f64], rho_axis: &[f64], norm: &[Vec<f64>]) -> Result<Self> {
        if norm.len() != z_axis.len() || norm.iter().any(|row| row.len() != rho_axis.len()) {
            return Err(ViewError::ShapeMismatch(format!(
                "axes {}x{} but norm has {} rows",
                z_axis.len(),
                rho_axis.len(),
                norm.len()
            )));
        }

        let (nz, nr) = (z_axis.len(), rho_axis.len());
        Ok(Self {
            z: DMatrix::from_fn(nz, nr, |i, _| z_axis[i]),
            rho: DMatrix::from_fn(nz, nr, |_, j| rho_axis[j]),
            norm: DMatrix::from_fn(nz, nr, |i, j| norm[i][j]),
        })
    }

    pub fn rows(&self) -> usize {
        self.norm.nrows()
    }

    pub fn cols(&self) -> usize {
        self.norm.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }

    /// Axial coordinates, read from the first column
    pub fn z_axis(&self) -> Vec<f64> {
        if self.cols() == 0 {
            return Vec::new();
        }
        self.z.column(0).iter().copied().collect()
    }

    /// Radial coordinates, read from the first row
    pub fn rho_axis(&self) -> Vec<f64> {
        if self.rows() == 0 {
            return Vec::new();
        }
        self.rho.row(0).iter().copied().collect()
    }

    /// Copy of the closed index block `[i0, i1] x [j0, j1]`
    pub fn block(&self, i0: usize, i1: usize, j0: usize, j1: usize) -> Self {
        let nrows = (i1 + 1).saturating_sub(i0);
        let ncols = (j1 + 1).saturating_sub(j0);
        let copy = |m: &DMatrix<f64>| DMatrix::from_fn(nrows, ncols, |i, j| m[(i0 + i, j0 + j)]);
        Self {
            z: copy(&self.z),
            rho: copy(&self.rho),
            norm: copy(&self.norm),
        }
    }

    /// Smallest and largest magnitude, `None` when empty
    pub fn norm_extrema(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let (lo, hi) = self
            .norm
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some((lo, hi))
    }

    /// Data-aligned extent of this sample
    pub fn extent(&self) -> Option<Window> {
        let z = self.z_axis();
        let rho = self.rho_axis();
        Some(Window::new(*z.first()?, *z.last()?, *rho.first()?, *rho.last()?))
    }
}

/// Displayed rectangle in (z, rho) space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub z_min: f64,
    pub z_max: f64,
    pub rho_min: f64,
    pub rho_max: f64,
}

impl Window {
    pub fn new(z_min: f64, z_max: f64, rho_min: f64, rho_max: f64) -> Self {
        Self { z_min, z_max, rho_min, rho_max }
    }

    pub fn width(&self) -> f64 {
        self.z_max - self.z_min
    }

    pub fn height(&self) -> f64 {
        self.rho_max - self.rho_min
    }

    pub fn center(&self) -> (f64, f64) {
        (0.5 * (self.z_max + self.z_min), 0.5 * (self.rho_max + self.rho_min))
    }

    pub fn contains(&self, z: f64, rho: f64) -> bool {
        z >= self.z_min && z <= self.z_max && rho >= self.rho_min && rho <= self.rho_max
    }
}

/// A circular coil as seen by the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coil {
    /// Axial position (m)
    pub position: f64,
    /// Radius (m)
    pub radius: f64,
    pub turns: u32,
    /// Current (A), carried for completeness
    #[serde(default)]
    pub current: f64,
    /// Color as `#rrggbb` or a basic color name
    #[serde(default = "default_coil_color")]
    pub color: String,
}

fn default_coil_color() -> String {
    "black".to_string()
}

/// Everything a finished simulation run hands to the viewer
#[derive(Debug, Clone)]
pub struct SimulationData {
    pub sample: FieldSample,
    pub bounds: Window,
    pub coils: Vec<Coil>,
}

/// JSON interchange form of [`SimulationData`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationFile {
    pub z_min: f64,
    pub z_max: f64,
    pub rho_min: f64,
    pub rho_max: f64,
    /// Axial sample positions
    pub z: Vec<f64>,
    /// Radial sample positions
    pub rho: Vec<f64>,
    /// `norm[i][j]` at `(z[i], rho[j])`
    pub norm: Vec<Vec<f64>>,
    #[serde(default)]
    pub coils: Vec<Coil>,
}

impl SimulationData {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: SimulationFile = serde_json::from_str(json)?;
        Ok(Self::try_from(file)?)
    }
}

impl TryFrom<SimulationFile> for SimulationData {
    type Error = ViewError;

    fn try_from(file: SimulationFile) -> Result<Self> {
        let sample = FieldSample::from_axes(&file.z, &file.rho, &file.norm)?;
        Ok(Self {
            sample,
            bounds: Window::new(file.z_min, file.z_max, file.rho_min, file.rho_max),
            coils: file.coils,
        })
    }
}
