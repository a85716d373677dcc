//! Render request wire model.
//!
//! [`RenderRequestBody`] is what arrives as JSON; [`RenderRequest`] is the validated, canonical
//! form used by the pipeline and as the identity key in the history store.
use std::fmt;
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;
use crate::qrcode::QrCodeEcc;

/// Accepted pixels-per-module range.
pub const BOX_SIZE_RANGE: (i64, i64) = (1, 50);
/// Accepted quiet-zone range, in modules.
pub const BORDER_RANGE: (i64, i64) = (0, 20);
/// Accepted explicit logo footprint range, in percent of the symbol area.
pub const LOGO_SIZE_RANGE: (i64, i64) = (1, 30);

const DEFAULT_FILL: &str = "#111827";
const DEFAULT_BACK: &str = "#ffffff";
const DEFAULT_BOX_SIZE: i64 = 10;
const DEFAULT_BORDER: i64 = 4;

/// An opaque RGB color, written as `#rrggbb`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Color([u8; 3]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0]);
    pub const WHITE: Color = Color([255, 255, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn channels(self) -> [u8; 3] {
        self.0
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, 255])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a color of the form #rrggbb")]
pub struct ParseColorError;

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').ok_or(ParseColorError)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseColorError);
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError);
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Raw JSON body of `POST /api/qrcode.png`.
///
/// Only `content` is required; the style fields default to what the web client starts with.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderRequestBody {
    pub content: String,
    #[serde(default = "default_fill")]
    pub fill_color: String,
    #[serde(default = "default_back")]
    pub back_color: String,
    #[serde(default = "default_box_size")]
    pub box_size: i64,
    #[serde(default = "default_border")]
    pub border: i64,
    #[serde(default = "default_error_correction")]
    pub error_correction: QrCodeEcc,
    #[serde(default = "default_rounded")]
    pub rounded: bool,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub logo_size: Option<i64>,
}

fn default_fill() -> String {
    DEFAULT_FILL.to_string()
}

fn default_back() -> String {
    DEFAULT_BACK.to_string()
}

fn default_box_size() -> i64 {
    DEFAULT_BOX_SIZE
}

fn default_border() -> i64 {
    DEFAULT_BORDER
}

fn default_error_correction() -> QrCodeEcc {
    QrCodeEcc::Medium
}

fn default_rounded() -> bool {
    true
}

/// A validated render request in canonical form.
///
/// Two requests that render the same image compare equal: colors are normalised to lowercase
/// hex and a blank `logo_url` becomes `None`. The whole tuple is the history identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RenderRequest {
    pub content: String,
    pub fill_color: Color,
    pub back_color: Color,
    pub box_size: u32,
    pub border: u32,
    pub error_correction: QrCodeEcc,
    pub rounded: bool,
    pub logo_url: Option<String>,
    /// Explicit logo footprint in percent of the symbol area; `None` picks the safe maximum.
    pub logo_size: Option<u32>,
}

impl RenderRequest {
    /// A request with the client's default styling for the given content.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fill_color: Color::rgb(0x11, 0x18, 0x27),
            back_color: Color::WHITE,
            box_size: DEFAULT_BOX_SIZE as u32,
            border: DEFAULT_BORDER as u32,
            error_correction: QrCodeEcc::Medium,
            rounded: true,
            logo_url: None,
            logo_size: None,
        }
    }
}

impl TryFrom<RenderRequestBody> for RenderRequest {
    type Error = ValidationError;

    fn try_from(body: RenderRequestBody) -> Result<Self, Self::Error> {
        if body.content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        let fill_color = parse_color("fill_color", &body.fill_color)?;
        let back_color = parse_color("back_color", &body.back_color)?;
        let box_size = check_range("box_size", body.box_size, BOX_SIZE_RANGE)?;
        let border = check_range("border", body.border, BORDER_RANGE)?;
        let logo_size = body
            .logo_size
            .map(|size| check_range("logo_size", size, LOGO_SIZE_RANGE))
            .transpose()?;

        let logo_url = match body.logo_url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(url) => Some(check_logo_url(url)?),
        };

        Ok(Self {
            content: body.content,
            fill_color,
            back_color,
            box_size,
            border,
            error_correction: body.error_correction,
            rounded: body.rounded,
            logo_url,
            logo_size,
        })
    }
}

fn parse_color(field: &'static str, value: &str) -> Result<Color, ValidationError> {
    value.trim().parse().map_err(|_| ValidationError::InvalidColor {
        field,
        value: value.to_string(),
    })
}

fn check_range(field: &'static str, value: i64, (min, max): (i64, i64)) -> Result<u32, ValidationError> {
    if (min..=max).contains(&value) {
        Ok(value as u32)
    } else {
        Err(ValidationError::OutOfRange { field, min, max, value })
    }
}

fn check_logo_url(url: &str) -> Result<String, ValidationError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|_| ValidationError::InvalidLogoUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" | "data" => Ok(url.to_string()),
        _ => Err(ValidationError::InvalidLogoUrl(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(json: serde_json::Value) -> RenderRequestBody {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_color_parse_and_display() {
        let color: Color = "#11AAff".parse().unwrap();
        assert_eq!(color, Color::rgb(0x11, 0xaa, 0xff));
        assert_eq!(color.to_string(), "#11aaff");
        assert_eq!(color.to_rgba(), Rgba([0x11, 0xaa, 0xff, 0xff]));

        for bad in ["11aaff", "#11aaf", "#11aaffe", "#11aafg", "", "#"] {
            assert_eq!(bad.parse::<Color>(), Err(ParseColorError), "{bad:?}");
        }
    }

    #[test]
    fn test_defaults_match_client() {
        let req = RenderRequest::try_from(body(serde_json::json!({ "content": "hi" }))).unwrap();
        assert_eq!(req, RenderRequest::with_content("hi"));
    }

    #[test]
    fn test_full_body_is_canonicalised() {
        let req = RenderRequest::try_from(body(serde_json::json!({
            "content": "https://example.com",
            "fill_color": "#FF0000",
            "back_color": " #00ff00 ",
            "box_size": 12,
            "border": 0,
            "error_correction": "H",
            "rounded": false,
            "logo_url": "   ",
            "logo_size": 10
        })))
        .unwrap();

        assert_eq!(req.fill_color.to_string(), "#ff0000");
        assert_eq!(req.back_color.to_string(), "#00ff00");
        assert_eq!(req.box_size, 12);
        assert_eq!(req.border, 0);
        assert_eq!(req.error_correction, QrCodeEcc::High);
        assert!(!req.rounded);
        assert_eq!(req.logo_url, None);
        assert_eq!(req.logo_size, Some(10));
    }

    #[test]
    fn test_null_logo_url_is_absent() {
        let req = RenderRequest::try_from(body(serde_json::json!({
            "content": "x",
            "logo_url": null
        })))
        .unwrap();
        assert_eq!(req.logo_url, None);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            (serde_json::json!({ "content": "" }), ValidationError::EmptyContent),
            (
                serde_json::json!({ "content": "x", "box_size": 0 }),
                ValidationError::OutOfRange { field: "box_size", min: 1, max: 50, value: 0 },
            ),
            (
                serde_json::json!({ "content": "x", "border": 21 }),
                ValidationError::OutOfRange { field: "border", min: 0, max: 20, value: 21 },
            ),
            (
                serde_json::json!({ "content": "x", "logo_size": 31 }),
                ValidationError::OutOfRange { field: "logo_size", min: 1, max: 30, value: 31 },
            ),
            (
                serde_json::json!({ "content": "x", "fill_color": "red" }),
                ValidationError::InvalidColor { field: "fill_color", value: "red".into() },
            ),
            (
                serde_json::json!({ "content": "x", "logo_url": "ftp://example.com/logo.png" }),
                ValidationError::InvalidLogoUrl("ftp://example.com/logo.png".into()),
            ),
            (
                serde_json::json!({ "content": "x", "logo_url": "not a url" }),
                ValidationError::InvalidLogoUrl("not a url".into()),
            ),
        ];
        for (json, expected) in cases {
            assert_eq!(RenderRequest::try_from(body(json)), Err(expected));
        }
    }

    #[test]
    fn test_unknown_error_correction_is_rejected_by_serde() {
        let parsed = serde_json::from_value::<RenderRequestBody>(serde_json::json!({
            "content": "x",
            "error_correction": "X"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_serialises_for_history() {
        let mut req = RenderRequest::with_content("hi");
        req.logo_url = Some("https://example.com/logo.png".into());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "content": "hi",
                "fill_color": "#111827",
                "back_color": "#ffffff",
                "box_size": 10,
                "border": 4,
                "error_correction": "M",
                "rounded": true,
                "logo_url": "https://example.com/logo.png",
                "logo_size": null
            })
        );
    }
}
