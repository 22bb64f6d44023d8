//! Validation of typed simulation parameters
//!
//! Text fields are classified as absent, invalid or valid before any range
//! checks, so a legitimate `0.0` is never mistaken for a missing value.

use thiserror::Error;

use crate::sample::Coil;

/// Points along the longer axis of an automatic grid
pub const AUTO_GRID_POINTS: usize = 100;
/// Exclusive bound on |current| (A)
pub const MAX_CURRENT: f64 = 150.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Simulation limits must be real numbers.")]
    LimitsNotNumeric,
    #[error("Min. value must be lower than Max. value.")]
    LimitsOrder,
    #[error("Number of simulation points must be greater than 0.")]
    PointCount,
    #[error("Radius must be a positive real.")]
    Radius,
    #[error("Number of turns must be a positive integer.")]
    Turns,
    #[error("Electric current must be a real between -150 and 150.")]
    Current,
    #[error("Position must be a real number.")]
    Position,
    #[error("At least one coil must be added.")]
    NoCoils,
}

/// Classified content of a numeric text field
#[derive(Debug, Clone, PartialEq)]
pub enum NumericInput<T> {
    Absent,
    Invalid(String),
    Valid(T),
}

impl<T: std::str::FromStr> NumericInput<T> {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return NumericInput::Absent;
        }
        match trimmed.parse::<T>() {
            Ok(v) => NumericInput::Valid(v),
            Err(_) => NumericInput::Invalid(trimmed.to_string()),
        }
    }
}

impl<T> NumericInput<T> {
    pub fn valid(self) -> Option<T> {
        match self {
            NumericInput::Valid(v) => Some(v),
            _ => None,
        }
    }
}

fn real(text: &str) -> Option<f64> {
    NumericInput::<f64>::parse(text).valid().filter(|v| v.is_finite())
}

/// Sampling grid for a simulation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub z_min: f64,
    pub z_max: f64,
    pub z_points: usize,
    pub rho_min: f64,
    pub rho_max: f64,
    pub rho_points: usize,
}

/// Raw grid dialog fields
#[derive(Debug, Clone, Default)]
pub struct GridText<'a> {
    pub z_min: &'a str,
    pub z_max: &'a str,
    pub z_points: &'a str,
    pub rho_min: &'a str,
    pub rho_max: &'a str,
    pub rho_points: &'a str,
}

impl GridSpec {
    /// Validate manually entered grid limits
    pub fn from_inputs(text: &GridText<'_>) -> Result<Self, InputError> {
        let limits = [text.z_min, text.z_max, text.rho_min, text.rho_max].map(real);
        let [Some(z_min), Some(z_max), Some(rho_min), Some(rho_max)] = limits else {
            return Err(InputError::LimitsNotNumeric);
        };

        if !(z_min < z_max && rho_min < rho_max) {
            return Err(InputError::LimitsOrder);
        }

        let count = |t: &str| NumericInput::<usize>::parse(t).valid().filter(|&n| n > 0);
        let (Some(z_points), Some(rho_points)) = (count(text.z_points), count(text.rho_points)) else {
            return Err(InputError::PointCount);
        };

        Ok(Self { z_min, z_max, z_points, rho_min, rho_max, rho_points })
    }

    /// Grid that encloses every coil, with the finer axis at [`AUTO_GRID_POINTS`]
    pub fn auto(coils: &[Coil]) -> Option<Self> {
        if coils.is_empty() {
            return None;
        }

        let mut z_min = coils.iter().map(|c| c.position).fold(f64::INFINITY, f64::min);
        let mut z_max = coils.iter().map(|c| c.position).fold(f64::NEG_INFINITY, f64::max);
        let rho_max = coils.iter().map(|c| c.radius).fold(f64::NEG_INFINITY, f64::max);
        let rho_min = -rho_max;

        if z_min == z_max {
            z_min -= rho_max;
            z_max += rho_max;
        }

        let dz = (z_max - z_min).abs();
        let drho = (rho_max - rho_min).abs();
        let n = AUTO_GRID_POINTS as f64;
        let (z_points, rho_points) = if dz > drho {
            (AUTO_GRID_POINTS, (drho * n / dz) as usize)
        } else {
            ((dz * n / drho) as usize, AUTO_GRID_POINTS)
        };

        Some(Self { z_min, z_max, z_points, rho_min, rho_max, rho_points })
    }

    /// Evenly spaced sample positions along both axes
    pub fn axes(&self) -> (Vec<f64>, Vec<f64>) {
        (
            linspace(self.z_min, self.z_max, self.z_points),
            linspace(self.rho_min, self.rho_max, self.rho_points),
        )
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..n)
            .map(|k| if k == n - 1 { hi } else { lo + (hi - lo) * k as f64 / (n - 1) as f64 })
            .collect(),
    }
}

/// Raw coil row fields
#[derive(Debug, Clone, Default)]
pub struct CoilText<'a> {
    pub radius: &'a str,
    pub turns: &'a str,
    pub current: &'a str,
    pub position: &'a str,
}

impl CoilText<'_> {
    pub fn validate(&self, color: &str) -> Result<Coil, InputError> {
        let radius = real(self.radius).filter(|&r| r > 0.0).ok_or(InputError::Radius)?;
        let turns = NumericInput::<u32>::parse(self.turns)
            .valid()
            .filter(|&n| n > 0)
            .ok_or(InputError::Turns)?;
        let current = real(self.current)
            .filter(|c| c.abs() < MAX_CURRENT)
            .ok_or(InputError::Current)?;
        let position = real(self.position).ok_or(InputError::Position)?;

        Ok(Coil { position, radius, turns, current, color: color.to_string() })
    }
}

/// Validate every coil row, stopping at the first bad one
pub fn validate_coils(rows: &[(CoilText<'_>, &str)]) -> Result<Vec<Coil>, InputError> {
    if rows.is_empty() {
        return Err(InputError::NoCoils);
    }
    rows.iter().map(|(text, color)| text.validate(color)).collect()
}
