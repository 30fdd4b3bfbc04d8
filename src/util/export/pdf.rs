use std::io::Cursor;

use log::warn;
use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Polygon, Px, Rgb,
    path::{PaintMode, WindingOrder},
};

use crate::FacturaError;
use crate::util::assets::{ImageAsset, ResolvedAssets};
use crate::util::text::Weight;

use super::{Color, DrawOp, ImageSlot, PAGE_HEIGHT, PAGE_WIDTH, PT_TO_MM, Page};

const LAYER: &str = "layer";

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, weight: Weight) -> &IndirectFontRef {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

fn mm(pt: f32) -> Mm {
    Mm(pt * PT_TO_MM)
}

fn pdf_color(color: Color) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb::new(color.r, color.g, color.b, None))
}

fn export_error(e: impl std::fmt::Display) -> FacturaError {
    FacturaError::Export(e.to_string())
}

/// Serializes laid out pages into a PDF held in memory.
pub(crate) fn write_pdf(
    title: &str,
    pages: &[Page],
    assets: &ResolvedAssets,
    header_color: Color,
) -> Result<Vec<u8>, FacturaError> {
    let (doc, page1, layer1) = PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER);
    let fonts = register_fonts(&doc, assets)?;

    // images are decoded once and added to every page that shows them
    let logo = assets
        .logo
        .as_ref()
        .map(|img| to_xobject(img, header_color.to_bytes()));
    let signature = assets
        .signature
        .as_ref()
        .map(|img| to_xobject(img, Color::WHITE.to_bytes()));

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page_index, layer_index) = doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER);
            doc.get_page(page_index).get_layer(layer_index)
        };

        for op in &page.ops {
            match op {
                DrawOp::Text {
                    text,
                    x,
                    y,
                    size,
                    weight,
                    color,
                } => {
                    layer.set_fill_color(pdf_color(*color));
                    layer.use_text(text, *size, mm(*x), mm(*y), fonts.get(*weight));
                }
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => render_rect(&layer, *x, *y, *width, *height, *color),
                DrawOp::Image {
                    slot,
                    x,
                    y,
                    width,
                    ..
                } => {
                    let source = match slot {
                        ImageSlot::Logo => logo.as_ref(),
                        ImageSlot::Signature => signature.as_ref(),
                    };
                    if let Some(xobject) = source {
                        render_image(&layer, xobject, *x, *y, *width);
                    }
                }
            }
        }
    }

    doc.save_to_bytes().map_err(export_error)
}

/// Embedded TrueType fonts when they register, Helvetica otherwise.
fn register_fonts(
    doc: &PdfDocumentReference,
    assets: &ResolvedAssets,
) -> Result<Fonts, FacturaError> {
    let register = |bytes: Option<&std::sync::Arc<Vec<u8>>>, fallback: printpdf::BuiltinFont| {
        if let Some(bytes) = bytes {
            let mut font_reader = Cursor::new(bytes.as_slice());
            match doc.add_external_font(&mut font_reader) {
                Ok(font) => return Ok(font),
                Err(e) => warn!("could not embed font, using {fallback:?}: {e}"),
            }
        }
        doc.add_builtin_font(fallback).map_err(export_error)
    };
    Ok(Fonts {
        regular: register(
            assets.fonts.regular.as_ref(),
            printpdf::BuiltinFont::Helvetica,
        )?,
        bold: register(
            assets.fonts.bold.as_ref(),
            printpdf::BuiltinFont::HelveticaBold,
        )?,
    })
}

fn render_rect(layer: &PdfLayerReference, x: f32, y: f32, width: f32, height: f32, color: Color) {
    let points = vec![
        (Point::new(mm(x), mm(y)), false),
        (Point::new(mm(x + width), mm(y)), false),
        (Point::new(mm(x + width), mm(y + height)), false),
        (Point::new(mm(x), mm(y + height)), false),
    ];
    layer.set_fill_color(pdf_color(color));
    layer.add_polygon(Polygon {
        rings: vec![points],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

fn to_xobject(image: &ImageAsset, background: [u8; 3]) -> ImageXObject {
    ImageXObject {
        width: Px(image.width as usize),
        height: Px(image.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: image.flatten(background),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    }
}

fn render_image(layer: &PdfLayerReference, xobject: &ImageXObject, x: f32, y: f32, width: f32) {
    // pixels per inch that make the image exactly `width` points wide
    let dpi = xobject.width.0 as f32 / (width / 72.0);
    Image::from(xobject.clone()).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(mm(x)),
            translate_y: Some(mm(y)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}
