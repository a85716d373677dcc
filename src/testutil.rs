//! Helpers shared by the unit tests: an independent decoder and synthetic logos.
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Rgba, RgbaImage};

use crate::qrcode::QrCode;

/// Decodes the single QR symbol in `img` with rqrr, returning its raw payload.
pub fn decode_luma(img: &GrayImage) -> Vec<u8> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        img.width() as usize,
        img.height() as usize,
        |x, y| img.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one symbol");
    let mut payload = Vec::new();
    grids[0].decode_to(&mut payload).expect("symbol should decode");
    payload
}

/// Draws the module matrix at 4px per module with a 4-module quiet zone, then decodes it.
pub fn decode_matrix(qr: &QrCode) -> Vec<u8> {
    const SCALE: u32 = 4;
    const BORDER: u32 = 4;
    let side = (qr.size() as u32 + 2 * BORDER) * SCALE;
    let img = GrayImage::from_fn(side, side, |px, py| {
        let x = (px / SCALE) as i32 - BORDER as i32;
        let y = (py / SCALE) as i32 - BORDER as i32;
        image::Luma([if qr.get_module(x, y) { 0 } else { 255 }])
    });
    decode_luma(&img)
}

pub fn decode_image(img: &RgbaImage) -> Vec<u8> {
    decode_luma(&DynamicImage::ImageRgba8(img.clone()).to_luma8())
}

pub fn decode_png(png: &[u8]) -> Vec<u8> {
    let img = image::load_from_memory_with_format(png, ImageFormat::Png).expect("valid png");
    decode_luma(&img.to_luma8())
}

/// A logo of one flat color.
pub fn solid_logo(width: u32, height: u32, color: Rgba<u8>) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color))
}

pub fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("png encoding");
    buf.into_inner()
}
