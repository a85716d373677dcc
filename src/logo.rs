//! Centered logo overlay bounded by the error correction budget.
//!
//! The logo sits on a plate of whole modules painted in the background color. The plate's size
//! is the smallest of three limits:
//!
//! - an area budget: 40% of the level's recoverable fraction of the symbol area,
//! - a clearance of 9 modules from every edge, which keeps finders and format bits intact,
//! - a damage bound: the number of codewords of any one block the plate can touch must stay
//!   below half that block's error correction codewords.
//!
//! An explicit footprint larger than the area budget is refused; one that fits the area budget
//! but not the damage bound is shrunk.
use image::imageops::{self, FilterType};
use image::DynamicImage;
use tracing::{debug, warn};

use crate::qrcode::{QrCode, QrCodeEcc, Version};
use crate::render::RasterImage;

/// Plates narrower than this, in modules, would not show a recognisable logo.
pub const MIN_PLATE_MODULES: u32 = 3;

const EDGE_CLEARANCE: u32 = 9;

/// The requested logo footprint is more than the error correction level can absorb.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("a logo covering {requested}% of the symbol exceeds the {allowed:.1}% that level {level} can absorb")]
pub struct LogoTooLargeError {
    pub requested: u32,
    pub allowed: f64,
    pub level: QrCodeEcc,
}

/// Largest logo footprint, in percent of the symbol area, allowed at `ecl`.
pub fn safe_area_percent(ecl: QrCodeEcc) -> f64 {
    f64::from(ecl.recovery_percent() * 4) / 10.0
}

/// Resolves the footprint to use: the explicit request if it is within budget, the budget
/// itself when nothing was requested.
pub fn check_footprint(ecl: QrCodeEcc, requested: Option<u32>) -> Result<f64, LogoTooLargeError> {
    let allowed = safe_area_percent(ecl);
    match requested {
        Some(percent) if f64::from(percent) > allowed => Err(LogoTooLargeError {
            requested: percent,
            allowed,
            level: ecl,
        }),
        Some(percent) => Ok(f64::from(percent)),
        None => Ok(allowed),
    }
}

/// Side, in modules, of the plate placed on a symbol of `version` at `ecl` for a footprint of
/// `area_percent`. Always has the same parity as the symbol so it centres on whole modules;
/// may be smaller than [`MIN_PLATE_MODULES`].
pub fn plate_modules(version: Version, ecl: QrCodeEcc, area_percent: f64) -> u32 {
    let size = version.size() as u32;
    let by_area = ((area_percent / 100.0).sqrt() * f64::from(size)).floor() as u32;
    let by_edges = size.saturating_sub(2 * EDGE_CLEARANCE);

    let mut side = by_area.min(by_edges);
    if side % 2 != size % 2 {
        side = side.saturating_sub(1);
    }

    let (blocks, ecc) = QrCode::ecc_block_layout(version, ecl);
    let tolerable = (ecc / 2).saturating_sub(1);
    while side > 0 && worst_block_damage(side, blocks) > tolerable {
        side = side.saturating_sub(2);
    }
    side
}

// Codewords run in two-column strips; a square of `side` modules meets at most side/2 + 1
// strips and, in each, a run of at most ceil(side/4) + 1 consecutive codewords. Consecutive
// codewords are interleaved round-robin across blocks.
fn worst_block_damage(side: u32, blocks: usize) -> usize {
    let side = side as usize;
    let strips = side / 2 + 1;
    let per_strip = side.div_ceil(4) + 1;
    strips * per_strip.div_ceil(blocks)
}

/// Composites `logo` onto the centre of `raster`.
///
/// # Arguments
///
/// * `raster` - The rendered symbol.
/// * `logo` - Any decoded image; it is resized to fit the plate, keeping its aspect ratio.
/// * `ecl` - The error correction level the symbol was encoded with.
/// * `requested` - Explicit footprint in percent of the symbol area, or `None` for the maximum.
///
/// # Errors
///
/// [`LogoTooLargeError`] when `requested` exceeds [`safe_area_percent`]. A plate that would be
/// narrower than [`MIN_PLATE_MODULES`] is not an error: the raster is returned untouched.
pub fn overlay(
    mut raster: RasterImage,
    logo: &DynamicImage,
    ecl: QrCodeEcc,
    requested: Option<u32>,
) -> Result<RasterImage, LogoTooLargeError> {
    let area = check_footprint(ecl, requested)?;
    let plate = plate_modules(raster.version(), ecl, area);
    if plate < MIN_PLATE_MODULES {
        warn!(
            version = raster.version().value(),
            level = %ecl,
            plate,
            "logo would be too small to see, rendering without it"
        );
        return Ok(raster);
    }

    let box_size = raster.box_size();
    let plate_px = plate * box_size;
    let offset = raster.symbol_origin() + (raster.modules() - plate) / 2 * box_size;
    let margin = box_size / 2;
    let inner = plate_px - 2 * margin;
    let back = raster.back().to_rgba();

    let fitted = logo.resize(inner, inner, FilterType::Triangle).to_rgba8();
    let x = offset + margin + (inner - fitted.width()) / 2;
    let y = offset + margin + (inner - fitted.height()) / 2;

    let pixels = raster.pixels_mut();
    for py in offset..offset + plate_px {
        for px in offset..offset + plate_px {
            pixels.put_pixel(px, py, back);
        }
    }
    imageops::overlay(pixels, &fitted, i64::from(x), i64::from(y));

    debug!(
        plate,
        width = fitted.width(),
        height = fitted.height(),
        "composited logo"
    );
    Ok(raster)
}
