//! Logo retrieval.
//!
//! Fetching is best effort: [`fetch_logo`] folds every failure, including timeouts, into
//! `None` so that a broken logo URL never costs the caller their QR code.
use std::io::Cursor;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::future::BoxFuture;
use image::{DynamicImage, ImageReader, Limits};
use tracing::{debug, warn};

/// Logos wider or taller than this are refused before decoding.
pub const MAX_LOGO_DIMENSION: u32 = 4096;

#[derive(Debug, thiserror::Error)]
pub enum LogoFetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("logo is larger than {limit} bytes")]
    TooLarge { limit: usize },
    #[error("malformed data URL")]
    MalformedDataUrl,
    #[error("unsupported logo URL scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("could not read logo: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode logo: {0}")]
    Decode(#[from] image::ImageError),
}

/// Source of logo images.
pub trait LogoFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<DynamicImage, LogoFetchError>>;
}

/// Fetches `http`/`https` URLs with reqwest and decodes inline `data:` URLs.
#[derive(Debug, Clone)]
pub struct HttpLogoFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpLogoFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("qrstyle/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, max_bytes })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, LogoFetchError> {
        if let Some(rest) = url.strip_prefix("data:") {
            return decode_data_url(rest, self.max_bytes);
        }

        let parsed = reqwest::Url::parse(url).map_err(|_| LogoFetchError::UnsupportedScheme(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LogoFetchError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let mut response = self.client.get(parsed).send().await?.error_for_status()?;
        if response.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(LogoFetchError::TooLarge { limit: self.max_bytes });
        }
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > self.max_bytes {
                return Err(LogoFetchError::TooLarge { limit: self.max_bytes });
            }
        }
        Ok(body)
    }
}

impl LogoFetcher for HttpLogoFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<DynamicImage, LogoFetchError>> {
        Box::pin(async move {
            let bytes = self.fetch_bytes(url).await?;
            decode_image(&bytes)
        })
    }
}

/// Decodes the part of a `data:` URL after the scheme. Only base64 payloads are accepted.
fn decode_data_url(rest: &str, max_bytes: usize) -> Result<Vec<u8>, LogoFetchError> {
    let (meta, payload) = rest.split_once(',').ok_or(LogoFetchError::MalformedDataUrl)?;
    if !meta.ends_with(";base64") {
        return Err(LogoFetchError::MalformedDataUrl);
    }
    if payload.len() / 4 * 3 > max_bytes {
        return Err(LogoFetchError::TooLarge { limit: max_bytes });
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|_| LogoFetchError::MalformedDataUrl)
}

fn decode_image(bytes: &[u8]) -> Result<DynamicImage, LogoFetchError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_LOGO_DIMENSION);
    limits.max_image_height = Some(MAX_LOGO_DIMENSION);

    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(limits);
    Ok(reader.decode()?)
}

/// Runs `fetcher` under `timeout` and keeps only a successful result.
pub async fn fetch_logo(fetcher: &dyn LogoFetcher, url: &str, timeout: Duration) -> Option<DynamicImage> {
    let shown = abbreviate(url);
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(Ok(logo)) => {
            debug!(url = shown, width = logo.width(), height = logo.height(), "fetched logo");
            Some(logo)
        }
        Ok(Err(err)) => {
            warn!(url = shown, %err, "logo unavailable, rendering without it");
            None
        }
        Err(_) => {
            warn!(url = shown, ?timeout, "logo fetch timed out, rendering without it");
            None
        }
    }
}

// data: URLs can be megabytes long; keep log lines short.
fn abbreviate(url: &str) -> &str {
    match url.char_indices().nth(80) {
        Some((idx, _)) => &url[..idx],
        None => url,
    }
}
