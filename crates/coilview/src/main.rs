//! coilview-render: CLI tool for rendering a coil field sample to an image

use anyhow::{Context, Result};
use clap::Parser;
use coilview::{open, Colormap, ExportOptions, ViewConfig};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "coilview-render")]
#[command(about = "Render a sampled coil magnetic field to png, jpg, pdf or svg")]
#[command(version)]
struct Args {
    /// Input JSON file (simulation result)
    #[arg(short, long)]
    input: PathBuf,

    /// Output image; the format follows the extension
    #[arg(short, long)]
    output: PathBuf,

    /// Zoom in percent of the full extent (arithmetic allowed, e.g. "2*100")
    #[arg(long)]
    zoom: Option<String>,

    /// Lower color bound (arithmetic allowed, e.g. "1e-3/2")
    #[arg(long, requires = "max")]
    min: Option<String>,

    /// Upper color bound
    #[arg(long, requires = "min")]
    max: Option<String>,

    /// Colormap name (viridis, plasma, inferno, magma, cividis, jet, hot, cool, coolwarm, gray)
    #[arg(long, default_value = "viridis")]
    colormap: String,

    /// Also draw the reflected lower half-plane
    #[arg(long)]
    mirror: bool,

    /// Image width in pixels
    #[arg(long, default_value = "800", value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value = "800", value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Resolution used to convert coil line widths
    #[arg(long, default_value = "80", value_parser = clap::value_parser!(u32).range(1..))]
    dpi: u32,

    /// Print the scene as JSON to stdout
    #[arg(long)]
    scene_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Read input
    let json = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {:?}", args.input))?;

    // Build config
    let colormap: Colormap = args.colormap.parse()?;
    let config = ViewConfig {
        colormap,
        mirror: args.mirror,
        export: ExportOptions {
            width: args.width,
            height: args.height,
            dpi: args.dpi,
        },
    };

    let mut viewer = open(&json, &config).context("Failed to load simulation data")?;

    // Apply view changes in the order a user would
    if let Some(zoom) = &args.zoom {
        let status = viewer.zoom(zoom).context("Zoom failed")?;
        eprintln!("{}", status);
    }
    if let (Some(min), Some(max)) = (&args.min, &args.max) {
        let status = viewer.apply_limits(min, max).context("Invalid color limits")?;
        eprintln!("{}", status);
    }

    let (lo, hi) = viewer.state().bound_labels();
    eprintln!("Color range: [{}, {}]", lo, hi);

    // Output
    if args.scene_json {
        let scene = serde_json::to_string_pretty(viewer.scene()).context("Failed to serialize scene")?;
        println!("{}", scene);
    }

    let status = viewer
        .export(&args.output)
        .with_context(|| format!("Failed to write output file: {:?}", args.output))?;
    eprintln!("{}", status);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["coilview-render", "-i", "field.json", "-o", "field.png"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn test_dpi_must_be_positive() {
        assert!(parse(&["--dpi", "0"]).is_err());
        assert_eq!(parse(&["--dpi", "300"]).unwrap().dpi, 300);
        assert_eq!(parse(&[]).unwrap().dpi, 80);
        assert!(parse(&["--width", "0"]).is_err());
    }

    #[test]
    fn test_limits_come_in_pairs() {
        assert!(parse(&["--min", "1"]).is_err());
        assert!(parse(&["--min", "1", "--max", "2"]).is_ok());
    }
}
