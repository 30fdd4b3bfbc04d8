//! Loading of logo, signature and font assets.
//!
//! Sources are `data:` URIs, `http(s)://` URLs or filesystem paths. Every failure is logged and
//! turned into an absent asset; a render never fails because of an asset.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use image::ImageFormat;
use log::{debug, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::RenderOptions;
use crate::util::text::FontMetrics;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

static ASSET_CACHE: Lazy<Mutex<HashMap<String, Arc<Vec<u8>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Process-wide cache of fetched asset bytes, keyed by source string.
/// Only successful loads of URLs and paths are cached; data URIs carry their own bytes.
pub struct AssetCache;

impl AssetCache {
    fn get(source: &str) -> Option<Arc<Vec<u8>>> {
        ASSET_CACHE
            .lock()
            .ok()
            .and_then(|cache| cache.get(source).cloned())
    }

    fn insert(source: &str, bytes: Arc<Vec<u8>>) {
        if let Ok(mut cache) = ASSET_CACHE.lock() {
            cache.insert(source.to_owned(), bytes);
        }
    }

    pub fn clear() {
        match ASSET_CACHE.lock() {
            Ok(mut cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        debug!("asset cache cleared");
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid data URI: {0}")]
    DataUri(String),
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("could not decode image as PNG or JPEG")]
    UndecodableImage,
    #[error("not a usable TrueType font: {0}")]
    InvalidFont(String),
}

/// A decoded raster image in 8-bit RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageAsset {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Composites the image onto a solid background and drops the alpha channel.
    pub fn flatten(&self, background: [u8; 3]) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.rgba.len() / 4 * 3);
        for pixel in self.rgba.chunks_exact(4) {
            let alpha = pixel[3] as f32 / 255.0;
            for (channel, bg) in pixel[..3].iter().zip(background) {
                let value = *channel as f32 * alpha + bg as f32 * (1.0 - alpha);
                rgb.push(value.round() as u8);
            }
        }
        rgb
    }
}

/// Optional TrueType font sources, one per weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontSources {
    pub regular: Option<String>,
    pub medium: Option<String>,
    pub semibold: Option<String>,
}

/// Font bytes picked per weight. A missing weight falls back to builtin Helvetica.
#[derive(Debug, Clone, Default)]
pub struct FontSet {
    pub regular: Option<Arc<Vec<u8>>>,
    pub bold: Option<Arc<Vec<u8>>>,
}

impl FontSet {
    pub fn metrics(&self) -> FontMetrics {
        FontMetrics::new(self.regular.clone(), self.bold.clone())
    }
}

/// Everything a layout pass needs from the outside world, loaded up front.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAssets {
    pub logo: Option<ImageAsset>,
    pub signature: Option<ImageAsset>,
    pub fonts: FontSet,
}

#[derive(Debug, Clone)]
pub struct AssetLoader {
    timeout: Duration,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl AssetLoader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Loads logo, signature and fonts for one render. The logo falls back to `default_logo`
    /// only when the options name no logo at all.
    pub fn resolve(
        &self,
        options: &RenderOptions,
        fonts: &FontSources,
        default_logo: Option<&str>,
    ) -> ResolvedAssets {
        let logo = options
            .logo_source()
            .or(default_logo.filter(|s| !s.trim().is_empty()))
            .and_then(|source| self.load_image(source));
        let signature = options
            .signature_source()
            .and_then(|source| self.load_image(source));
        ResolvedAssets {
            logo,
            signature,
            fonts: self.load_fonts(fonts),
        }
    }

    pub fn load_fonts(&self, sources: &FontSources) -> FontSet {
        let load = |source: &Option<String>| {
            source
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .and_then(|s| self.load_font(s))
        };
        let regular = load(&sources.regular);
        let medium = load(&sources.medium);
        let semibold = load(&sources.semibold);
        FontSet {
            regular: regular.clone().or(medium.clone()).or(semibold.clone()),
            bold: semibold.or(medium).or(regular),
        }
    }

    pub fn load_image(&self, source: &str) -> Option<ImageAsset> {
        let result = self.fetch_bytes(source).and_then(|bytes| {
            let image = decode_image(&bytes)?;
            remember(source, bytes);
            Ok(image)
        });
        match result {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("image {} could not be loaded: {e}", describe_source(source));
                None
            }
        }
    }

    pub fn load_font(&self, source: &str) -> Option<Arc<Vec<u8>>> {
        let result = self.fetch_bytes(source).and_then(|bytes| {
            ttf_parser::Face::parse(&bytes, 0)
                .map(|_| ())
                .map_err(|e| AssetError::InvalidFont(e.to_string()))?;
            remember(source, bytes.clone());
            Ok(bytes)
        });
        match result {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("font {} could not be loaded: {e}", describe_source(source));
                None
            }
        }
    }

    pub fn fetch_bytes(&self, source: &str) -> Result<Arc<Vec<u8>>, AssetError> {
        let source = source.trim();
        if source.starts_with("data:") {
            return decode_data_uri(source).map(Arc::new);
        }
        if let Some(bytes) = AssetCache::get(source) {
            debug!("asset {source} served from cache");
            return Ok(bytes);
        }
        let bytes = if is_http(source) {
            self.fetch_http(source)?
        } else {
            std::fs::read(source)?
        };
        Ok(Arc::new(bytes))
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response = client.get(url).send()?;
        if !response.status().is_success() {
            return Err(AssetError::Status(response.status().as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

// only called once the bytes decoded, so failures are never cached
fn remember(source: &str, bytes: Arc<Vec<u8>>) {
    let source = source.trim();
    if !source.starts_with("data:") {
        AssetCache::insert(source, bytes);
    }
}

fn is_http(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

// data URIs can be megabytes long, keep the log line short
fn describe_source(source: &str) -> String {
    if source.starts_with("data:") {
        let header = source.split(',').next().unwrap_or("data:");
        format!("{header},…")
    } else {
        source.to_owned()
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let payload = uri
        .split_once(";base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| AssetError::DataUri("only base64 payloads are supported".into()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AssetError::DataUri(e.to_string()))?;
    if bytes.is_empty() {
        return Err(AssetError::DataUri("empty payload".into()));
    }
    Ok(bytes)
}

/// PNG first, JPEG as fallback.
fn decode_image(bytes: &[u8]) -> Result<ImageAsset, AssetError> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .or_else(|_| image::load_from_memory_with_format(bytes, ImageFormat::Jpeg))
        .map_err(|_| AssetError::UndecodableImage)?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetError::UndecodableImage);
    }
    Ok(ImageAsset {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
pub(crate) mod test_images {
    use super::*;
    use image::{DynamicImage, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([20, 120, 200]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    pub(crate) fn png_data_uri(width: u32, height: u32) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png_bytes(width, height))
        )
    }
}
