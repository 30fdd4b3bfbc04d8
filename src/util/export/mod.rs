//! Display list shared by the layout engine and the PDF writer.
//!
//! All coordinates are PDF points with the origin in the bottom-left corner of the page.

use log::warn;

use crate::data::{DEFAULT_HEADER_COLOR, RenderOptions};
use crate::util::text::Weight;

pub(crate) mod invoice;
pub(crate) mod pdf;

pub(crate) const PT_TO_MM: f32 = 0.352_778_f32;

// A4 portrait
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    /// Parses `#rrggbb` or `#rgb`, with or without the leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_owned(),
            _ => return None,
        };
        let value = u32::from_str_radix(&expanded, 16).ok()?;
        let channel = |shift: u32| ((value >> shift) & 0xff) as f32 / 255.0;
        Some(Self::rgb(channel(16), channel(8), channel(0)))
    }

    pub fn to_bytes(self) -> [u8; 3] {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [byte(self.r), byte(self.g), byte(self.b)]
    }
}

/// Header band color of the options, falling back to the default on unparsable input.
pub(crate) fn header_color(options: &RenderOptions) -> Color {
    let hex = options.header_color_hex();
    Color::from_hex(hex).unwrap_or_else(|| {
        warn!("invalid header color {hex:?}, using {DEFAULT_HEADER_COLOR}");
        Color::from_hex(DEFAULT_HEADER_COLOR).unwrap_or(Color::BLACK)
    })
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ImageSlot {
    Logo,
    Signature,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` is the baseline.
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        weight: Weight,
        color: Color,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    Image {
        slot: ImageSlot,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_digit_hex() {
        let color = Color::from_hex("#161616").unwrap();
        assert_eq!(color.to_bytes(), [0x16, 0x16, 0x16]);
        assert_eq!(Color::from_hex("ff8000").unwrap().to_bytes(), [255, 128, 0]);
    }

    #[test]
    fn parses_three_digit_hex() {
        assert_eq!(Color::from_hex("#fa0").unwrap().to_bytes(), [255, 170, 0]);
    }

    #[test]
    fn rejects_invalid_hex() {
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#gggggg").is_none());
        assert!(Color::from_hex("").is_none());
        assert!(Color::from_hex("#+12345").is_none());
    }

    #[test]
    fn invalid_header_color_falls_back() {
        let options = RenderOptions {
            header_color_hex: Some("nope".into()),
            ..Default::default()
        };
        assert_eq!(header_color(&options).to_bytes(), [0x16, 0x16, 0x16]);
        let options = RenderOptions {
            header_color_hex: Some("#00f".into()),
            ..Default::default()
        };
        assert_eq!(header_color(&options), Color::rgb(0.0, 0.0, 1.0));
    }
}
