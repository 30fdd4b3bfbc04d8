//! Layout and pagination of invoices and quotes into A4 PDFs.

use log::info;
use thiserror::Error;

pub mod config;
pub mod data;
pub mod invoice;
pub mod messages;
pub mod util;

pub use data::{Invoice, RenderOptions};
pub use data::totals::Totals;
pub use invoice::free_text::{ParsedGroup, ParsedItem, parse_free_text};
pub use invoice::merge_parsed_groups;
pub use util::assets::{AssetLoader, ResolvedAssets};
pub use util::export::invoice::layout_invoice;

#[derive(Debug, Error)]
pub enum FacturaError {
    #[error("PDF export failed: {0}")]
    Export(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config Error: {0}")]
    Config(String),
    #[error("Invalid invoice: {0}")]
    Validation(String),
}

/// Lays out the invoice and serializes the pages into PDF bytes.
pub fn render_invoice_pdf(
    invoice: &Invoice,
    options: &RenderOptions,
    assets: &ResolvedAssets,
) -> Result<Vec<u8>, FacturaError> {
    let pages = layout_invoice(invoice, options, assets);
    let bytes = util::export::pdf::write_pdf(
        options.title(),
        &pages,
        assets,
        util::export::header_color(options),
    )?;
    info!(
        "rendered invoice {} on {} page(s), {} bytes",
        invoice.id,
        pages.len(),
        bytes.len()
    );
    Ok(bytes)
}
