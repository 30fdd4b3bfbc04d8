//! Text measurement and greedy line wrapping.
//!
//! Widths are in PDF points. An embedded TrueType font is measured through its glyph advances;
//! without one the builtin Helvetica AFM widths are used, which is also what the PDF falls back to.

use std::sync::Arc;

use azul_text_layout::{
    text_layout::{split_text_into_words, words_to_scaled_words},
    text_shaping::get_font_metrics_freetype,
};

use log::warn;

// Helvetica's space, used when a font has no space glyph
const SPACE_WIDTH_EM: f32 = 0.278;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum Weight {
    #[default]
    Regular,
    Bold,
}

pub trait Measure {
    /// Rendered width of `text` in points.
    fn measure(&self, text: &str, size: f32, weight: Weight) -> f32;
}

/// TrueType font bytes with the advance of its space glyph, read once.
#[derive(Debug, Clone)]
struct TrueTypeFont {
    bytes: Arc<Vec<u8>>,
    space_em: f32,
}

impl TrueTypeFont {
    fn parse(bytes: Arc<Vec<u8>>) -> Option<Self> {
        let space_em = match ttf_parser::Face::parse(bytes.as_slice(), 0) {
            Ok(face) => space_advance_em(&face).unwrap_or(SPACE_WIDTH_EM),
            Err(e) => {
                warn!("font can not be measured, using builtin widths: {e}");
                return None;
            }
        };
        Some(Self { bytes, space_em })
    }
}

/// Advance of the space glyph as a fraction of the em.
fn space_advance_em(face: &ttf_parser::Face) -> Option<f32> {
    let glyph = face.glyph_index(' ')?;
    let advance = face.glyph_hor_advance(glyph)?;
    Some(f32::from(advance) / f32::from(face.units_per_em()))
}

/// Measures with the embedded TrueType font of the matching weight, falling back to the
/// builtin Helvetica widths when that weight has no font.
#[derive(Debug, Clone, Default)]
pub struct FontMetrics {
    regular: Option<TrueTypeFont>,
    bold: Option<TrueTypeFont>,
}

impl FontMetrics {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn new(regular: Option<Arc<Vec<u8>>>, bold: Option<Arc<Vec<u8>>>) -> Self {
        Self {
            regular: regular.and_then(TrueTypeFont::parse),
            bold: bold.and_then(TrueTypeFont::parse),
        }
    }
}

impl Measure for FontMetrics {
    fn measure(&self, text: &str, size: f32, weight: Weight) -> f32 {
        let font = match weight {
            Weight::Regular => self.regular.as_ref(),
            Weight::Bold => self.bold.as_ref(),
        };
        match font {
            Some(font) => measure_true_type(font, text, size),
            None => BuiltinMetrics.measure(text, size, weight),
        }
    }
}

/// Metrics of the PDF standard Helvetica family.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinMetrics;

impl Measure for BuiltinMetrics {
    fn measure(&self, text: &str, size: f32, weight: Weight) -> f32 {
        let table = match weight {
            Weight::Regular => &HELVETICA_WIDTHS,
            Weight::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        let units: u32 = text.chars().map(|c| builtin_char_width(table, c)).sum();
        units as f32 / 1000.0 * size
    }
}

fn builtin_char_width(table: &[u16; 128], c: char) -> u32 {
    let c = fold_latin1(c);
    if c.is_ascii() {
        return table[c as usize] as u32;
    }
    match c {
        '•' => 350,
        '–' => 556,
        '—' => 1000,
        'º' | 'ª' => 365,
        '¿' | '¡' => 333,
        _ => 556,
    }
}

// accented letters share the advance of their base letter in Helvetica
fn fold_latin1(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'Ñ' => 'N',
        other => other,
    }
}

/// Width of `text` set in the given TrueType font. Words are shaped by azul, which leaves the
/// spaces between them out, so those are added with the font's own space advance.
fn measure_true_type(font: &TrueTypeFont, text: &str, size: f32) -> f32 {
    if text.is_empty() {
        return 0.0;
    }
    let bytes = font.bytes.as_slice();
    let space_count = text.chars().filter(|&c| c == ' ').count();
    let font_index: i32 = 0;
    let font_metrics = get_font_metrics_freetype(bytes, font_index);
    let words = split_text_into_words(text);
    // Use pt in pdf as px and assume 72 DPI
    let scaled_words = words_to_scaled_words(&words, bytes, font_index as u32, font_metrics, size);

    let total_width: f32 = scaled_words.items.iter().map(|i| i.word_width).sum();
    let space_width: f32 = space_count as f32 * font.space_em * size;
    total_width + space_width
}

/// Greedy word wrap by measured width. Words wider than `max_width` are broken by character.
/// Never returns an empty list: empty input gives a single empty line.
pub fn wrap_by_width(
    measure: &dyn Measure,
    text: &str,
    max_width: f32,
    size: f32,
    weight: Weight,
) -> Vec<String> {
    let fits = |candidate: &str| measure.measure(candidate, size, weight) <= max_width;
    let mut lines = Vec::new();
    let mut line = String::new();

    let mut push_piece = |piece: &str, line: &mut String, lines: &mut Vec<String>| {
        if line.is_empty() {
            line.push_str(piece);
            return;
        }
        let trial = format!("{line} {piece}");
        if fits(&trial) {
            *line = trial;
        } else {
            lines.push(std::mem::take(line));
            line.push_str(piece);
        }
    };

    for word in text.split_whitespace() {
        if fits(word) {
            push_piece(word, &mut line, &mut lines);
        } else {
            for chunk in break_token_by_width(measure, word, max_width, size, weight) {
                push_piece(&chunk, &mut line, &mut lines);
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Splits one over-long token into the fewest pieces that fit. A single character wider than
/// the bound becomes its own piece.
fn break_token_by_width(
    measure: &dyn Measure,
    token: &str,
    max_width: f32,
    size: f32,
    weight: Weight,
) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in token.chars() {
        current.push(ch);
        if measure.measure(&current, size, weight) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Greedy word wrap by character count. Words longer than `max_chars` keep a line of their own.
/// Blank input yields no lines.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        if line.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        } else {
            line.push(' ');
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Collapses every whitespace run into a single space and trims.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Adobe AFM widths, 1000 units per em, ASCII only
#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 128] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
];

#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [u16; 128] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 0,
];

#[cfg(test)]
pub(crate) mod test_fonts {
    use std::sync::Arc;

    const SYSTEM_FONTS: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    /// A TrueType font installed on the machine, if any.
    pub(crate) fn system_font() -> Option<Arc<Vec<u8>>> {
        SYSTEM_FONTS
            .iter()
            .find_map(|path| std::fs::read(path).ok())
            .map(Arc::new)
    }

    fn be16(out: &mut Vec<u8>, value: u16) {
        out.extend_from_slice(&value.to_be_bytes());
    }

    fn be32(out: &mut Vec<u8>, value: u32) {
        out.extend_from_slice(&value.to_be_bytes());
    }

    /// Metrics-only font with two glyphs: `.notdef` (500 units) and one glyph of
    /// `advance` units mapped from `code`. 1000 units per em.
    pub(crate) fn metrics_font(code: u16, advance: u16) -> Vec<u8> {
        let mut cmap = Vec::new();
        be16(&mut cmap, 0);
        be16(&mut cmap, 1);
        be16(&mut cmap, 0); // unicode platform
        be16(&mut cmap, 3);
        be32(&mut cmap, 12);
        be16(&mut cmap, 6); // trimmed table mapping
        be16(&mut cmap, 12);
        be16(&mut cmap, 0);
        be16(&mut cmap, code);
        be16(&mut cmap, 1);
        be16(&mut cmap, 1);

        let mut head = Vec::new();
        be32(&mut head, 0x0001_0000);
        be32(&mut head, 0x0001_0000);
        be32(&mut head, 0);
        be32(&mut head, 0x5F0F_3CF5);
        be16(&mut head, 0);
        be16(&mut head, 1000);
        head.extend_from_slice(&[0; 24]); // dates and bounding box
        be16(&mut head, 0);
        be16(&mut head, 8);
        be16(&mut head, 2);
        be16(&mut head, 0);
        be16(&mut head, 0);

        let mut hhea = Vec::new();
        be32(&mut hhea, 0x0001_0000);
        hhea.extend_from_slice(&800i16.to_be_bytes());
        hhea.extend_from_slice(&(-200i16).to_be_bytes());
        be16(&mut hhea, 0);
        hhea.extend_from_slice(&[0; 24]);
        be16(&mut hhea, 2);

        let mut hmtx = Vec::new();
        for glyph_advance in [500, advance] {
            be16(&mut hmtx, glyph_advance);
            be16(&mut hmtx, 0);
        }

        let mut maxp = Vec::new();
        be32(&mut maxp, 0x0000_5000);
        be16(&mut maxp, 2);

        // table records must be sorted by tag
        let tables: [(&[u8; 4], Vec<u8>); 5] = [
            (b"cmap", cmap),
            (b"head", head),
            (b"hhea", hhea),
            (b"hmtx", hmtx),
            (b"maxp", maxp),
        ];
        let directory_len = 12 + 16 * tables.len();
        let mut font = Vec::new();
        be32(&mut font, 0x0001_0000);
        be16(&mut font, tables.len() as u16);
        font.extend_from_slice(&[0; 6]);
        let mut body: Vec<u8> = Vec::new();
        for (tag, data) in &tables {
            font.extend_from_slice(*tag);
            be32(&mut font, 0);
            be32(&mut font, (directory_len + body.len()) as u32);
            be32(&mut font, data.len() as u32);
            body.extend_from_slice(data);
            while body.len() % 4 != 0 {
                body.push(0);
            }
        }
        font.extend_from_slice(&body);
        font
    }
}
