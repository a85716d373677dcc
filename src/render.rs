//! Rasterizing QR symbols.
//!
//! Function patterns always paint as full squares so scanners lock on reliably; only data
//! modules take the rounded shape.
use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, RgbaImage};

use crate::qrcode::{QrCode, Version};
use crate::request::{Color, RenderRequest};

/// Smallest cell, in pixels, that can still show a circle distinct from a square.
pub const MIN_ROUNDED_BOX: u32 = 3;

/// Visual parameters for [`render`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderStyle {
    pub fill: Color,
    pub back: Color,
    /// Pixels per module.
    pub box_size: u32,
    /// Quiet zone width, in modules.
    pub border: u32,
    /// Paint dark data modules as inscribed circles.
    pub rounded: bool,
}

impl From<&RenderRequest> for RenderStyle {
    fn from(req: &RenderRequest) -> Self {
        Self {
            fill: req.fill_color,
            back: req.back_color,
            box_size: req.box_size,
            border: req.border,
            rounded: req.rounded,
        }
    }
}

impl RenderStyle {
    /// Side length in pixels of the canvas for a symbol of `modules` modules.
    pub fn canvas_side(&self, modules: u32) -> u64 {
        (u64::from(modules) + 2 * u64::from(self.border)) * u64::from(self.box_size)
    }
}

/// A rendered symbol together with the geometry needed to place things on it.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
    version: Version,
    box_size: u32,
    border: u32,
    back: Color,
}

impl RasterImage {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Symbol side in modules, without the quiet zone.
    pub fn modules(&self) -> u32 {
        self.version.size() as u32
    }

    pub fn box_size(&self) -> u32 {
        self.box_size
    }

    pub fn border(&self) -> u32 {
        self.border
    }

    pub fn back(&self) -> Color {
        self.back
    }

    /// Pixel offset of the symbol's top-left module on both axes.
    pub fn symbol_origin(&self) -> u32 {
        self.border * self.box_size
    }

    /// Encodes the raster as a PNG file.
    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut buf = Cursor::new(Vec::new());
        PngEncoder::new(&mut buf).write_image(
            self.pixels.as_raw(),
            self.pixels.width(),
            self.pixels.height(),
            ExtendedColorType::Rgba8,
        )?;
        Ok(buf.into_inner())
    }
}

/// Paints `qr` onto a fresh canvas.
///
/// The canvas is `(modules + 2 * border) * box_size` pixels square and starts out entirely in
/// the background color, so the quiet zone never carries anything else. Output depends only on
/// the arguments.
pub fn render(qr: &QrCode, style: &RenderStyle) -> RasterImage {
    let modules = qr.size() as u32;
    let side = (modules + 2 * style.border) * style.box_size;
    let mut pixels = RgbaImage::from_pixel(side, side, style.back.to_rgba());

    let circles = style.rounded && style.box_size >= MIN_ROUNDED_BOX;
    for y in 0..qr.size() {
        for x in 0..qr.size() {
            if !qr.get_module(x, y) {
                continue;
            }
            let left = (x as u32 + style.border) * style.box_size;
            let top = (y as u32 + style.border) * style.box_size;
            if circles && !qr.is_function_module(x, y) {
                paint_dot(&mut pixels, left, top, style);
            } else {
                paint_square(&mut pixels, left, top, style);
            }
        }
    }

    RasterImage {
        pixels,
        version: qr.version(),
        box_size: style.box_size,
        border: style.border,
        back: style.back,
    }
}

fn paint_square(pixels: &mut RgbaImage, left: u32, top: u32, style: &RenderStyle) {
    let fill = style.fill.to_rgba();
    for dy in 0..style.box_size {
        for dx in 0..style.box_size {
            pixels.put_pixel(left + dx, top + dy, fill);
        }
    }
}

// A pixel is inside when its centre lies within box_size/2 of the cell centre.
// Coordinates are doubled to stay in integers.
fn paint_dot(pixels: &mut RgbaImage, left: u32, top: u32, style: &RenderStyle) {
    let fill = style.fill.to_rgba();
    let d = i64::from(style.box_size);
    for dy in 0..style.box_size {
        for dx in 0..style.box_size {
            let cx = 2 * i64::from(dx) + 1 - d;
            let cy = 2 * i64::from(dy) + 1 - d;
            if cx * cx + cy * cy <= d * d {
                pixels.put_pixel(left + dx, top + dy, fill);
            }
        }
    }
}
