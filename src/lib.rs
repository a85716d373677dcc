//! # qrstyle
//!
//! A styled QR code rendering service.
//!
//! `qrstyle` encodes text into QR Code Model 2 symbols (versions 1 to 40, byte mode, four error
//! correction levels) and renders them to PNG with custom colors, optionally rounded data modules
//! and an optional centered logo. A small axum server exposes the renderer over HTTP and keeps a
//! bounded history of recent requests.
//!
//! ## Features
//!
//! - Reed–Solomon error correction and penalty-based mask selection.
//! - Square or circular data modules; finder, timing and alignment patterns stay square.
//! - Logos sized to what the chosen error correction level can absorb.
//! - `POST /api/qrcode.png` and `GET /api/history` endpoints.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Example
//!
//! Render a request to PNG bytes without going through HTTP:
//!
//! ```rust
//! use qrstyle::pipeline::{render_png, Limits};
//! use qrstyle::request::RenderRequest;
//!
//! let req = RenderRequest::with_content("https://example.com");
//! let png = render_png(&req, None, &Limits::default()).unwrap();
//! assert!(png.starts_with(b"\x89PNG"));
//! ```
//!
//! ## Modules
//!
//! - [`qrcode`]: Core QR code encoding functionality.
//! - [`render`]: Rasterizing symbols with colors and module shapes.
//! - [`logo`]: Centered logo overlay within the error correction budget.
//! - [`pipeline`]: Encode, render and overlay in one call.
//! - [`history`]: Bounded store of recent requests.
//! - [`server`]: The HTTP router.

pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod logging;
pub mod logo;
pub mod pipeline;
pub mod qrcode;
pub mod render;
pub mod request;
pub mod server;

#[cfg(test)]
mod testutil;
