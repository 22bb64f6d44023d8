//! Supported color mappings and coil color parsing
//!
//! Each map is a small table of evenly spaced control points, interpolated
//! linearly in RGB.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ViewError;

pub type Rgb = [u8; 3];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Cividis,
    Jet,
    Hot,
    Cool,
    Coolwarm,
    Gray,
}

impl Colormap {
    pub const ALL: [Colormap; 10] = [
        Colormap::Viridis,
        Colormap::Plasma,
        Colormap::Inferno,
        Colormap::Magma,
        Colormap::Cividis,
        Colormap::Jet,
        Colormap::Hot,
        Colormap::Cool,
        Colormap::Coolwarm,
        Colormap::Gray,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
            Colormap::Inferno => "inferno",
            Colormap::Magma => "magma",
            Colormap::Cividis => "cividis",
            Colormap::Jet => "jet",
            Colormap::Hot => "hot",
            Colormap::Cool => "cool",
            Colormap::Coolwarm => "coolwarm",
            Colormap::Gray => "gray",
        }
    }

    fn control_points(&self) -> &'static [Rgb] {
        match self {
            Colormap::Viridis => &[
                [68, 1, 84],
                [71, 44, 122],
                [59, 81, 139],
                [44, 113, 142],
                [33, 144, 141],
                [39, 173, 129],
                [92, 200, 99],
                [170, 220, 50],
                [253, 231, 37],
            ],
            Colormap::Plasma => &[
                [13, 8, 135],
                [84, 2, 163],
                [139, 10, 165],
                [185, 50, 137],
                [219, 92, 104],
                [244, 136, 73],
                [254, 188, 43],
                [240, 249, 33],
            ],
            Colormap::Inferno => &[
                [0, 0, 4],
                [40, 11, 84],
                [101, 21, 110],
                [159, 42, 99],
                [212, 72, 66],
                [245, 125, 21],
                [250, 193, 39],
                [252, 255, 164],
            ],
            Colormap::Magma => &[
                [0, 0, 4],
                [28, 16, 68],
                [79, 18, 123],
                [129, 37, 129],
                [181, 54, 122],
                [229, 80, 100],
                [251, 135, 97],
                [254, 194, 135],
                [252, 253, 191],
            ],
            Colormap::Cividis => &[
                [0, 34, 78],
                [39, 61, 108],
                [87, 92, 109],
                [125, 124, 120],
                [166, 157, 117],
                [212, 193, 99],
                [254, 232, 56],
            ],
            Colormap::Jet => &[
                [0, 0, 128],
                [0, 0, 255],
                [0, 128, 255],
                [0, 255, 255],
                [128, 255, 128],
                [255, 255, 0],
                [255, 128, 0],
                [255, 0, 0],
                [128, 0, 0],
            ],
            Colormap::Hot => &[[11, 0, 0], [255, 0, 0], [255, 255, 0], [255, 255, 255]],
            Colormap::Cool => &[[0, 255, 255], [255, 0, 255]],
            Colormap::Coolwarm => &[
                [59, 76, 192],
                [124, 159, 249],
                [192, 212, 245],
                [242, 203, 183],
                [238, 133, 105],
                [180, 4, 38],
            ],
            Colormap::Gray => &[[0, 0, 0], [255, 255, 255]],
        }
    }

    /// Color at normalized position `t` (clamped to [0, 1])
    pub fn color_at(&self, t: f64) -> Rgb {
        let points = self.control_points();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let x = t * (points.len() - 1) as f64;
        let i = x.floor() as usize;
        if i >= points.len() - 1 {
            return points[points.len() - 1];
        }
        let f = x - i as f64;
        let (a, b) = (points[i], points[i + 1]);
        let lerp = |k: usize| (a[k] as f64 + f * (b[k] as f64 - a[k] as f64)).round() as u8;
        [lerp(0), lerp(1), lerp(2)]
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Colormap::ALL
            .iter()
            .copied()
            .find(|c| c.name() == wanted || (wanted == "grey" && *c == Colormap::Gray))
            .ok_or_else(|| ViewError::UnknownColormap(s.to_string()))
    }
}

/// Parse a coil color: `#rrggbb`, `#rgb` or a basic name. Unknown values render black.
pub fn parse_color(s: &str) -> Rgb {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .filter_map(|c| c.to_digit(16).map(|d| d as u8))
            .collect();
        if digits.len() != hex.len() {
            return [0, 0, 0];
        }
        return match digits.len() {
            6 => [digits[0] * 16 + digits[1], digits[2] * 16 + digits[3], digits[4] * 16 + digits[5]],
            3 => [digits[0] * 17, digits[1] * 17, digits[2] * 17],
            _ => [0, 0, 0],
        };
    }

    match s.to_lowercase().as_str() {
        "red" | "r" => [255, 0, 0],
        "green" | "g" => [0, 128, 0],
        "blue" | "b" => [0, 0, 255],
        "cyan" | "c" => [0, 191, 191],
        "magenta" | "m" => [191, 0, 191],
        "yellow" | "y" => [191, 191, 0],
        "white" | "w" => [255, 255, 255],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "gray" | "grey" => [128, 128, 128],
        "brown" => [165, 42, 42],
        _ => [0, 0, 0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(Colormap::Gray.color_at(0.0), [0, 0, 0]);
        assert_eq!(Colormap::Gray.color_at(1.0), [255, 255, 255]);
        assert_eq!(Colormap::Gray.color_at(0.5), [128, 128, 128]);
        assert_eq!(Colormap::Viridis.color_at(-3.0), [68, 1, 84]);
        assert_eq!(Colormap::Viridis.color_at(7.0), [253, 231, 37]);
        assert_eq!(Colormap::Viridis.color_at(f64::NAN), [68, 1, 84]);
    }

    #[test]
    fn test_names_round_trip() {
        for cmap in Colormap::ALL {
            assert_eq!(cmap.name().parse::<Colormap>().unwrap(), cmap);
        }
        assert_eq!(" Jet ".parse::<Colormap>().unwrap(), Colormap::Jet);
        assert_eq!("grey".parse::<Colormap>().unwrap(), Colormap::Gray);
        assert!(matches!("rainbow_r".parse::<Colormap>(), Err(ViewError::UnknownColormap(_))));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff8000"), [255, 128, 0]);
        assert_eq!(parse_color("#0f0"), [0, 255, 0]);
        assert_eq!(parse_color("Red"), [255, 0, 0]);
        assert_eq!(parse_color("#zzzzzz"), [0, 0, 0]);
        assert_eq!(parse_color("chartreuse"), [0, 0, 0]);
    }
}
