//! Image export of the current scene
//!
//! The format follows the file extension. png and jpg/jpeg are drawn on a
//! plotters bitmap, svg on the plotters SVG backend, and pdf wraps the
//! bitmap in a single page sized by the export resolution.

use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use tracing::{info, warn};

use crate::error::{ExportReason, Result, ViewError};
use crate::plot;
use crate::render::Scene;

/// Field cell edge (px) on bitmap backends
const RASTER_CELL_PX: u32 = 1;
/// Field cell edge (px) in SVG output
const SVG_CELL_PX: u32 = 4;

/// Output size of exported images
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixels per inch; line widths are given in points
    pub dpi: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { width: 800, height: 800, dpi: 80 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
    Pdf,
    Svg,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> std::result::Result<Self, ExportReason> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            "pdf" => Ok(ExportFormat::Pdf),
            "svg" => Ok(ExportFormat::Svg),
            _ => Err(ExportReason::UnsupportedFormat(ext)),
        }
    }
}

/// Write `scene` to `path`; the scene itself is never modified
pub fn export_scene(scene: &Scene, path: &Path, opts: &ExportOptions) -> Result<()> {
    let fail = |reason| ViewError::ExportFailure { path: path.to_path_buf(), reason };
    let format = ExportFormat::from_path(path).map_err(fail)?;

    let outcome = match format {
        ExportFormat::Png => save_raster(scene, path, opts, ImageFormat::Png),
        ExportFormat::Jpeg => save_raster(scene, path, opts, ImageFormat::Jpeg),
        ExportFormat::Pdf => pdf_bytes(scene, opts).and_then(|bytes| Ok(fs::write(path, bytes)?)),
        ExportFormat::Svg => svg_string(scene, opts).and_then(|svg| Ok(fs::write(path, svg)?)),
    };

    match outcome {
        Ok(()) => {
            info!("Exported {:?} to {:?}", format, path);
            Ok(())
        }
        Err(reason) => {
            warn!("Export to {:?} failed: {}", path, reason);
            Err(fail(reason))
        }
    }
}

fn plot_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> ExportReason {
    ExportReason::Plot(err.to_string())
}

/// Draw the scene into an in-memory RGB image
pub fn rasterize(scene: &Scene, opts: &ExportOptions) -> std::result::Result<RgbImage, ExportReason> {
    let (width, height) = (opts.width, opts.height);
    let mut buf = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        plot::draw_scene(&root, scene, opts, RASTER_CELL_PX).map_err(plot_error)?;
        root.present().map_err(plot_error)?;
    }
    RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| ExportReason::Plot(format!("no {}x{} image buffer", width, height)))
}

fn save_raster(
    scene: &Scene,
    path: &Path,
    opts: &ExportOptions,
    format: ImageFormat,
) -> std::result::Result<(), ExportReason> {
    rasterize(scene, opts)?.save_with_format(path, format)?;
    Ok(())
}

fn svg_string(scene: &Scene, opts: &ExportOptions) -> std::result::Result<String, ExportReason> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (opts.width, opts.height)).into_drawing_area();
        plot::draw_scene(&root, scene, opts, SVG_CELL_PX).map_err(plot_error)?;
        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

// =============================================================================
// PDF
// =============================================================================

/// Sequentially numbered PDF objects with their byte offsets
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        Self { buf: b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec(), offsets: Vec::new() }
    }

    fn object(&mut self, body: &[u8]) -> usize {
        self.offsets.push(self.buf.len());
        let id = self.offsets.len();
        self.buf.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
        id
    }

    fn stream(&mut self, dict: &str, data: &[u8]) -> usize {
        let mut body = format!("<< {} /Length {} >>\nstream\n", dict, data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object(&body)
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        let xref = self.buf.len();
        let count = self.offsets.len() + 1;
        let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", count);
        for offset in &self.offsets {
            table.push_str(&format!("{:010} 00000 n \n", offset));
        }
        table.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            count, root, info, xref
        ));
        self.buf.extend_from_slice(table.as_bytes());
        self.buf
    }
}

/// Single-page PDF showing the rendered bitmap at the export resolution
fn pdf_bytes(scene: &Scene, opts: &ExportOptions) -> std::result::Result<Vec<u8>, ExportReason> {
    let img = rasterize(scene, opts)?;
    let pt_per_px = 72.0 / opts.dpi.max(1) as f64;
    let page_w = (opts.width as f64 * pt_per_px).round();
    let page_h = (opts.height as f64 * pt_per_px).round();

    let mut pdf = PdfWriter::new();
    let catalog = pdf.object(b"<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.object(
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /XObject << /Im1 4 0 R >> >> /Contents 5 0 R >>",
            page_w, page_h
        )
        .as_bytes(),
    );
    let dict = format!(
        "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
         /BitsPerComponent 8 /Filter /FlateDecode",
        img.width(),
        img.height()
    );
    pdf.stream(&dict, &deflate(img.as_raw())?);
    let ops = format!("q {} 0 0 {} 0 0 cm /Im1 Do Q\n", page_w, page_h);
    pdf.stream("/Filter /FlateDecode", &deflate(ops.as_bytes())?);
    let info = pdf.object(
        format!(
            "<< /Producer (coilview) /CreationDate (D:{}Z) >>",
            chrono::Utc::now().format("%Y%m%d%H%M%S")
        )
        .as_bytes(),
    );

    Ok(pdf.finish(catalog, info))
}
