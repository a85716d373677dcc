//! Request to PNG: encode, rasterize, overlay the logo, serialize.
use image::DynamicImage;
use tracing::debug;

use crate::error::{RenderError, ValidationError};
use crate::logo;
use crate::qrcode::QrCode;
use crate::render::{render, RenderStyle};
use crate::request::RenderRequest;

/// Largest canvas side, in pixels, rendered by default.
pub const DEFAULT_MAX_IMAGE_SIDE: u32 = 4096;

/// Resource guards applied to every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_image_side: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_image_side: DEFAULT_MAX_IMAGE_SIDE,
        }
    }
}

/// Renders `req` to PNG bytes.
///
/// Pure: the same request and logo always produce the same bytes. `logo` is the already
/// fetched image for `req.logo_url`; pass `None` to render without one.
pub fn render_png(
    req: &RenderRequest,
    logo: Option<&DynamicImage>,
    limits: &Limits,
) -> Result<Vec<u8>, RenderError> {
    let ecl = req.error_correction;
    let qr = QrCode::encode_text(&req.content, ecl)?;

    let style = RenderStyle::from(req);
    let side = style.canvas_side(qr.size() as u32);
    if side > u64::from(limits.max_image_side) {
        return Err(ValidationError::ImageTooLarge {
            side,
            max: limits.max_image_side,
        }
        .into());
    }

    let mut raster = render(&qr, &style);
    if let Some(logo) = logo {
        raster = logo::overlay(raster, logo, ecl, req.logo_size)?;
    }

    let png = raster.to_png()?;
    debug!(
        version = qr.version().value(),
        mask = qr.mask().value(),
        side,
        bytes = png.len(),
        "rendered symbol"
    );
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qrcode::QrCodeEcc;
    use crate::request::Color;
    use crate::testutil::{decode_png, solid_logo};
    use image::Rgba;

    fn example() -> RenderRequest {
        RenderRequest {
            content: "https://example.com".into(),
            fill_color: "#111827".parse().unwrap(),
            back_color: Color::WHITE,
            box_size: 10,
            border: 4,
            error_correction: QrCodeEcc::Medium,
            rounded: true,
            logo_url: None,
            logo_size: None,
        }
    }

    #[test]
    fn test_example_renders_and_decodes() {
        let png = render_png(&example(), None, &Limits::default()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (330, 330));
        assert_eq!(decode_png(&png), b"https://example.com".to_vec());
    }

    #[test]
    fn test_output_is_deterministic() {
        let req = example();
        let logo = solid_logo(30, 30, Rgba([200, 0, 0, 255]));
        let a = render_png(&req, Some(&logo), &Limits::default()).unwrap();
        let b = render_png(&req, Some(&logo), &Limits::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_canvas_guard() {
        // Version 2 at 10px per module and a 4-module border is 330px wide
        let tight = Limits { max_image_side: 329 };
        let err = render_png(&example(), None, &tight).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Validation(ValidationError::ImageTooLarge { side: 330, max: 329 })
        ));
        let exact = Limits { max_image_side: 330 };
        assert!(render_png(&example(), None, &exact).is_ok());

        // 200 bytes at M need version 10 (57 modules): (57 + 40) * 50 = 4850px
        let mut req = example();
        req.content = "y".repeat(200);
        req.box_size = 50;
        req.border = 20;
        let err = render_png(&req, None, &Limits::default()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Validation(ValidationError::ImageTooLarge { side: 4850, max: 4096 })
        ));
        assert_eq!(err.reason(), "validation_error");

        // Version 1 at the largest style still fits: (21 + 40) * 50 = 3050px
        req.content = "y".into();
        assert!(render_png(&req, None, &Limits::default()).is_ok());
    }

    #[test]
    fn test_encoding_failure_surfaces() {
        let mut req = example();
        req.content = "x".repeat(3000);
        req.error_correction = QrCodeEcc::Low;
        let err = render_png(&req, None, &Limits::default()).unwrap_err();
        assert_eq!(err.reason(), "encoding_error");
    }

    #[test]
    fn test_oversized_logo_rejected() {
        let mut req = example();
        req.logo_size = Some(25);
        let logo = solid_logo(10, 10, Rgba([0, 0, 0, 255]));
        let err = render_png(&req, Some(&logo), &Limits::default()).unwrap_err();
        assert_eq!(err.reason(), "logo_too_large");

        // Without a logo the footprint is never checked here
        assert!(render_png(&req, None, &Limits::default()).is_ok());
    }

    #[test]
    fn test_logo_render_decodes() {
        let mut req = example();
        req.error_correction = QrCodeEcc::High;
        let logo = solid_logo(48, 48, Rgba([0, 90, 200, 255]));
        let png = render_png(&req, Some(&logo), &Limits::default()).unwrap();
        assert_eq!(decode_png(&png), b"https://example.com".to_vec());
    }
}
