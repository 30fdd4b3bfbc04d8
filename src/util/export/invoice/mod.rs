//! Single-pass layout of an invoice onto A4 pages.
//!
//! The cursor only ever moves down. Before every unit that may not fit (group heading, item
//! row, notes or terms line, totals and signature blocks) the remaining space is checked and a
//! new page with its header band is started if needed. Footers are added once the page count
//! is known.

use log::debug;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    data::{
        Group, Invoice, LineItem, RenderOptions,
        currency::{Currency, format_amount},
        non_empty,
        totals::invoice_totals,
    },
    messages::Messages,
    util::{
        assets::ResolvedAssets,
        format_date,
        text::{FontMetrics, Measure, Weight, collapse_whitespace, wrap_by_width, wrap_text},
    },
};

use super::{Color, DrawOp, ImageSlot, PAGE_HEIGHT, PAGE_WIDTH, Page, header_color};

const MARGIN_X: f32 = 40.0;
pub(crate) const LEFT: f32 = MARGIN_X;
pub(crate) const RIGHT: f32 = PAGE_WIDTH - MARGIN_X;

pub(crate) const HEADER_HEIGHT: f32 = 64.0;
pub(crate) const FOOTER_HEIGHT: f32 = 26.0;
pub(crate) const CONTENT_TOP: f32 = PAGE_HEIGHT - HEADER_HEIGHT - 20.0;
pub(crate) const CONTENT_MIN: f32 = 80.0 + FOOTER_HEIGHT;

const FONT_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 12.0;
const ROW_HEIGHT: f32 = 14.0;
const SECTION_TITLE_SIZE: f32 = 12.0;

const LOGO_HEIGHT: f32 = 40.0;
const TITLE_SIZE: f32 = 14.0;
const SIGNATURE_HEIGHT: f32 = 63.0;
const FOOTER_TEXT_SIZE: f32 = 8.0;
const FOOTER_TEXT_Y: f32 = 8.0;

// COLUMNS
const EVENT_COL_WIDTH: f32 = 240.0;
const EVENT_X: f32 = RIGHT - EVENT_COL_WIDTH;
const QTY_X: f32 = LEFT;
const DESC_X: f32 = LEFT + 60.0;
const UNIT_RIGHT: f32 = RIGHT - 120.0;
const TOTAL_RIGHT: f32 = RIGHT;
const DESC_WIDTH: f32 = UNIT_RIGHT - DESC_X - 8.0;

const ADDRESS_MAX_CHARS: usize = 42;
const PROSE_MAX_CHARS: usize = 96;
const BULLET_MAX_CHARS: usize = 88;
const BULLET_INDENT: f32 = 14.0;
const TOTALS_GAP: f32 = 16.0;

const DIVIDER_COLOR: Color = Color::rgb(0.85, 0.86, 0.9);
const TABLE_HEADER_COLOR: Color = Color::rgb(0.96, 0.97, 1.0);
const FOOTER_COLOR: Color = Color::gray(0.96);
const FOOTER_TEXT_COLOR: Color = Color::gray(0.25);
const MUTED_TEXT_COLOR: Color = Color::gray(0.35);

/// Read-only inputs of one layout pass.
struct LayoutContext<'a> {
    invoice: &'a Invoice,
    options: &'a RenderOptions,
    assets: &'a ResolvedAssets,
    metrics: FontMetrics,
    header_color: Color,
}

impl LayoutContext<'_> {
    fn width(&self, text: &str, size: f32, weight: Weight) -> f32 {
        self.metrics.measure(text, size, weight)
    }
}

/// Pages laid out so far and the vertical position of the next baseline on the last one.
#[derive(Debug, Default)]
pub struct LayoutState {
    pub pages: Vec<Page>,
    pub cursor_y: f32,
}

impl LayoutState {
    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn push(&mut self, op: DrawOp) {
        self.page().ops.push(op);
    }

    fn add_page(&mut self, ctx: &LayoutContext) {
        self.pages.push(Page::default());
        render_header(self, ctx);
        self.cursor_y = CONTENT_TOP;
    }

    /// Starts a new page when `needed` points would cross into the footer area. A fresh page
    /// never breaks again, so units taller than a page are placed anyway.
    fn ensure_space(&mut self, ctx: &LayoutContext, needed: f32) -> bool {
        if self.cursor_y - needed < CONTENT_MIN && self.cursor_y < CONTENT_TOP {
            debug!(
                "page break before {needed}pt at y={}, starting page {}",
                self.cursor_y,
                self.pages.len() + 1
            );
            self.add_page(ctx);
            return true;
        }
        false
    }

    fn text(&mut self, text: &str, x: f32, y: f32, size: f32, weight: Weight, color: Color) {
        if text.is_empty() {
            return;
        }
        self.push(DrawOp::Text {
            text: text.to_owned(),
            x,
            y,
            size,
            weight,
            color,
        });
    }

    fn body(&mut self, text: &str, x: f32, y: f32) {
        self.text(text, x, y, FONT_SIZE, Weight::Regular, Color::BLACK);
    }

    fn bold(&mut self, text: &str, x: f32, y: f32, size: f32) {
        self.text(text, x, y, size, Weight::Bold, Color::BLACK);
    }

    #[allow(clippy::too_many_arguments)]
    fn text_right(
        &mut self,
        ctx: &LayoutContext,
        text: &str,
        right: f32,
        y: f32,
        size: f32,
        weight: Weight,
        color: Color,
    ) {
        let x = right - ctx.width(text, size, weight);
        self.text(text, x, y, size, weight, color);
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn divider(&mut self) {
        self.rect(LEFT, self.cursor_y - 6.0, RIGHT - LEFT, 0.8, DIVIDER_COLOR);
    }
}

/// Lays out the whole invoice. Missing assets simply leave their element out.
pub fn layout_invoice(
    invoice: &Invoice,
    options: &RenderOptions,
    assets: &ResolvedAssets,
) -> Vec<Page> {
    let ctx = LayoutContext {
        invoice,
        options,
        assets,
        metrics: assets.fonts.metrics(),
        header_color: header_color(options),
    };
    let mut state = LayoutState::default();
    state.add_page(&ctx);

    render_meta(&mut state, &ctx);
    render_parties(&mut state, &ctx);
    render_items_heading(&mut state, &ctx);
    for group in &invoice.groups {
        render_group(&mut state, &ctx, group);
    }
    render_totals(&mut state, &ctx);
    render_bank_details(&mut state, &ctx);
    render_notes(&mut state, &ctx);
    render_terms(&mut state, &ctx);
    render_signature(&mut state, &ctx);

    let mut pages = state.pages;
    render_footers(&mut pages, &ctx);
    pages
}

fn render_header(state: &mut LayoutState, ctx: &LayoutContext) {
    let band_y = PAGE_HEIGHT - HEADER_HEIGHT;
    state.rect(0.0, band_y, PAGE_WIDTH, HEADER_HEIGHT, ctx.header_color);

    if let Some(logo) = &ctx.assets.logo {
        state.push(DrawOp::Image {
            slot: ImageSlot::Logo,
            x: LEFT,
            y: band_y + (HEADER_HEIGHT - LOGO_HEIGHT) / 2.0,
            width: LOGO_HEIGHT * logo.aspect_ratio(),
            height: LOGO_HEIGHT,
        });
    }

    let title_y = band_y + (HEADER_HEIGHT - 12.0) / 2.0;
    state.text_right(
        ctx,
        ctx.options.title(),
        RIGHT,
        title_y,
        TITLE_SIZE,
        Weight::Bold,
        Color::WHITE,
    );
}

fn render_meta(state: &mut LayoutState, ctx: &LayoutContext) {
    let meta = &ctx.invoice.meta;
    let number = non_empty(&meta.number).map(|number| match non_empty(&meta.series) {
        Some(series) => format!("{} {series}-{number}", Messages::Number),
        None => format!("{} {number}", Messages::Number),
    });
    let issued = Some(meta.issued_at.as_str())
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!("{}: {}", Messages::Date, format_date(d)));
    let due = non_empty(&meta.due_at).map(|d| format!("{}: {}", Messages::Due, format_date(d)));

    for line in [number, issued, due].into_iter().flatten() {
        let y = state.cursor_y;
        state.text_right(ctx, &line, RIGHT, y, FONT_SIZE, Weight::Regular, Color::BLACK);
        state.cursor_y -= LINE_HEIGHT;
    }
    state.cursor_y -= 10.0;
}

/// Client on the left, event on the right, advanced row by row so long addresses or locations
/// continue on the next page.
fn render_parties(state: &mut LayoutState, ctx: &LayoutContext) {
    let client = &ctx.invoice.client;
    let event = ctx.invoice.event.as_ref();

    let mut left = vec![client.name.clone()];
    left.extend(non_empty(&client.contact).map(str::to_owned));
    left.extend(non_empty(&client.dpi).map(|dpi| format!("{}: {dpi}", Messages::Dpi)));
    if let Some(address) = non_empty(&client.address) {
        left.extend(multiline(address));
    }

    let mut right = Vec::new();
    if let Some(event) = event {
        right.extend(non_empty(&event.name).map(str::to_owned));
        right.extend(non_empty(&event.date).map(format_date));
        if let Some(location) = non_empty(&event.location) {
            right.extend(multiline(location));
        }
    }

    state.ensure_space(ctx, ROW_HEIGHT + LINE_HEIGHT);
    let y = state.cursor_y;
    state.bold(Messages::Client.msg(), LEFT, y, FONT_SIZE);
    if event.is_some() {
        state.bold(Messages::Event.msg(), EVENT_X, y, FONT_SIZE);
    }
    state.cursor_y -= ROW_HEIGHT;

    for row in 0..left.len().max(right.len()) {
        state.ensure_space(ctx, LINE_HEIGHT);
        let y = state.cursor_y;
        if let Some(line) = left.get(row).filter(|l| !l.is_empty()) {
            state.body(line, LEFT, y);
        }
        if let Some(line) = right.get(row).filter(|l| !l.is_empty()) {
            state.body(line, EVENT_X, y);
        }
        state.cursor_y -= LINE_HEIGHT;
    }
    state.cursor_y -= 8.0;
}

/// Source lines wrapped at the address width. Empty source lines stay as blank rows.
fn multiline(text: &str) -> Vec<String> {
    text.lines()
        .flat_map(|raw| {
            if raw.trim().is_empty() {
                vec![String::new()]
            } else {
                wrap_text(raw, ADDRESS_MAX_CHARS)
            }
        })
        .collect()
}

fn render_items_heading(state: &mut LayoutState, ctx: &LayoutContext) {
    state.ensure_space(ctx, 32.0 + 24.0);
    state.divider();
    state.cursor_y -= 32.0;
    let y = state.cursor_y;
    state.text(
        ctx.options.items_heading(),
        LEFT,
        y,
        20.0,
        Weight::Regular,
        Color::BLACK,
    );
    state.cursor_y -= 24.0;
}

fn item_description_lines(ctx: &LayoutContext, item: &LineItem) -> Vec<String> {
    wrap_by_width(
        &ctx.metrics,
        &item.desc,
        DESC_WIDTH,
        FONT_SIZE,
        Weight::Regular,
    )
}

fn row_height(lines: &[String]) -> f32 {
    ROW_HEIGHT * lines.len().max(1) as f32
}

fn render_group(state: &mut LayoutState, ctx: &LayoutContext, group: &Group) {
    let rows: Vec<Vec<String>> = group
        .items
        .iter()
        .map(|item| item_description_lines(ctx, item))
        .collect();

    // keep the title, the column header and the first row together
    let first_row = rows.first().map(|r| row_height(r)).unwrap_or_default();
    state.ensure_space(ctx, 16.0 + ROW_HEIGHT + first_row);

    let y = state.cursor_y;
    state.bold(&group.title, LEFT, y, SECTION_TITLE_SIZE);
    state.cursor_y -= 16.0;
    render_table_header(state, ctx);

    for (item, lines) in group.items.iter().zip(&rows) {
        let height = row_height(lines);
        if state.ensure_space(ctx, height) {
            render_table_header(state, ctx);
        }
        render_row(state, ctx, item, lines);
        state.cursor_y -= height;
    }

    state.cursor_y -= 8.0;
}

fn render_table_header(state: &mut LayoutState, ctx: &LayoutContext) {
    let y = state.cursor_y;
    state.rect(LEFT, y - 2.0, RIGHT - LEFT, 16.0, TABLE_HEADER_COLOR);
    state.bold(Messages::Qty.msg(), QTY_X, y, FONT_SIZE);
    state.bold(Messages::Description.msg(), DESC_X, y, FONT_SIZE);
    state.text_right(
        ctx,
        Messages::PricePerUnit.msg(),
        UNIT_RIGHT,
        y,
        FONT_SIZE,
        Weight::Bold,
        Color::BLACK,
    );
    state.text_right(
        ctx,
        Messages::Total.msg(),
        TOTAL_RIGHT,
        y,
        FONT_SIZE,
        Weight::Bold,
        Color::BLACK,
    );
    state.cursor_y -= ROW_HEIGHT;
}

fn render_row(state: &mut LayoutState, ctx: &LayoutContext, item: &LineItem, lines: &[String]) {
    let y = state.cursor_y;
    let currency = item.unit.currency;
    state.body(&item.qty.to_string(), QTY_X, y);
    state.text_right(
        ctx,
        &format_amount(item.unit.amount, currency),
        UNIT_RIGHT,
        y,
        FONT_SIZE,
        Weight::Regular,
        Color::BLACK,
    );
    state.text_right(
        ctx,
        &format_amount(item.line_total(), currency),
        TOTAL_RIGHT,
        y,
        FONT_SIZE,
        Weight::Regular,
        Color::BLACK,
    );

    let mut line_y = y;
    for line in lines {
        state.body(line, DESC_X, line_y);
        line_y -= ROW_HEIGHT;
    }
}

/// Tax rate as a whole percentage, e.g. 0.12 -> "12".
fn tax_percent(rate: Decimal) -> String {
    (rate * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

fn render_totals(state: &mut LayoutState, ctx: &LayoutContext) {
    let invoice = ctx.invoice;
    let totals = invoice_totals(invoice);
    let currency: Currency = invoice.currency;
    let rate_note = invoice
        .secondary_currency
        .as_ref()
        .and_then(|secondary| {
            non_empty(&secondary.rate_note).map(|note| format!("{}: {note}", secondary.code.label()))
        });

    let block = 12.0 + 6.0 + 14.0 + 16.0 + 16.0 + if rate_note.is_some() { 12.0 } else { 0.0 };
    state.ensure_space(ctx, block);
    state.divider();
    state.cursor_y -= 12.0;

    let tax_label = format!("{} ({}%)", Messages::TaxLabel, tax_percent(invoice.tax.rate));
    let sub_amount = format_amount(totals.subtotal, currency);
    let tax_amount = format_amount(totals.tax, currency);
    let total_amount = format_amount(totals.total, currency);

    let widest = ctx
        .width(&sub_amount, FONT_SIZE, Weight::Regular)
        .max(ctx.width(&tax_amount, FONT_SIZE, Weight::Regular))
        .max(ctx.width(&total_amount, SECTION_TITLE_SIZE, Weight::Bold));
    let label_right = RIGHT - widest - TOTALS_GAP;

    state.cursor_y -= 6.0;
    let rows = [
        (Messages::SubtotalLabel.msg(), sub_amount.as_str(), FONT_SIZE, Weight::Regular, 14.0),
        (tax_label.as_str(), tax_amount.as_str(), FONT_SIZE, Weight::Regular, 16.0),
        (Messages::TotalLabel.msg(), total_amount.as_str(), SECTION_TITLE_SIZE, Weight::Bold, 16.0),
    ];
    for (label, amount, size, amount_weight, advance) in rows {
        let y = state.cursor_y;
        state.text_right(ctx, label, label_right, y, size, Weight::Bold, Color::BLACK);
        state.text_right(ctx, amount, RIGHT, y, size, amount_weight, Color::BLACK);
        state.cursor_y -= advance;
    }

    if let Some(note) = rate_note {
        let y = state.cursor_y;
        state.text_right(ctx, &note, RIGHT, y, 9.0, Weight::Regular, MUTED_TEXT_COLOR);
        state.cursor_y -= LINE_HEIGHT;
    }

    state.ensure_space(ctx, 8.0 + 12.0);
    state.cursor_y -= 8.0;
    state.divider();
    state.cursor_y -= 12.0;
}

fn render_section_title(state: &mut LayoutState, title: &str) {
    state.cursor_y -= 10.0;
    let y = state.cursor_y;
    state.bold(title, LEFT, y, SECTION_TITLE_SIZE);
    state.cursor_y -= 16.0;
}

fn render_bank_details(state: &mut LayoutState, ctx: &LayoutContext) {
    let Some(bank) = ctx.invoice.bank.as_ref() else {
        return;
    };
    let lines: Vec<String> = bank
        .accounts()
        .map(|(currency, account)| {
            format!(
                "{}: {} – {} – {} – {}",
                currency.label(),
                account.bank,
                account.kind,
                account.account,
                account.name
            )
        })
        .collect();
    if lines.is_empty() {
        return;
    }

    state.ensure_space(ctx, 10.0 + 16.0 + ROW_HEIGHT * lines.len() as f32);
    render_section_title(state, Messages::BankData.msg());
    for line in lines {
        let y = state.cursor_y;
        state.body(&line, LEFT, y);
        state.cursor_y -= ROW_HEIGHT;
    }
}

fn render_notes(state: &mut LayoutState, ctx: &LayoutContext) {
    let Some(notes) = non_empty(&ctx.invoice.notes) else {
        return;
    };
    state.ensure_space(ctx, 10.0 + 16.0 + LINE_HEIGHT);
    render_section_title(state, Messages::Notes.msg());
    for line in wrap_text(&collapse_whitespace(notes), PROSE_MAX_CHARS) {
        state.ensure_space(ctx, LINE_HEIGHT);
        let y = state.cursor_y;
        state.body(&line, LEFT, y);
        state.cursor_y -= LINE_HEIGHT;
    }
}

/// Splits on blank lines, `\n\n` or `\r\n\r\n`.
fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    normalized.split("\n\n").map(str::to_owned).collect()
}

/// Returns the text after a `-`, `*`, `•` or `N.` list marker.
fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = if let Some(rest) = trimmed.strip_prefix(['-', '*', '•']) {
        rest
    } else {
        let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return None;
        }
        trimmed[digits..].strip_prefix('.')?
    };
    let text = rest.trim_start();
    // the marker must be followed by whitespace
    (text.len() < rest.len()).then_some(text)
}

fn render_terms(state: &mut LayoutState, ctx: &LayoutContext) {
    let Some(terms) = non_empty(&ctx.invoice.terms) else {
        return;
    };
    state.ensure_space(ctx, 10.0 + 16.0 + LINE_HEIGHT);
    render_section_title(state, Messages::Terms.msg());

    for paragraph in split_paragraphs(terms) {
        let lines: Vec<&str> = paragraph.lines().collect();
        if lines.iter().any(|l| strip_bullet(l).is_some()) {
            render_bullets(state, ctx, &lines);
        } else {
            for line in wrap_text(&collapse_whitespace(&paragraph), PROSE_MAX_CHARS) {
                state.ensure_space(ctx, LINE_HEIGHT);
                let y = state.cursor_y;
                state.body(&line, LEFT, y);
                state.cursor_y -= LINE_HEIGHT;
            }
        }
        state.cursor_y -= 6.0;
    }
}

fn render_bullets(state: &mut LayoutState, ctx: &LayoutContext, lines: &[&str]) {
    for line in lines {
        if line.trim().is_empty() {
            state.cursor_y -= 6.0;
            continue;
        }
        let text = strip_bullet(line).unwrap_or(line);
        for (i, wrapped) in wrap_text(text, BULLET_MAX_CHARS).iter().enumerate() {
            state.ensure_space(ctx, LINE_HEIGHT);
            let y = state.cursor_y;
            if i == 0 {
                state.body("•", LEFT, y);
            }
            state.body(wrapped, LEFT + BULLET_INDENT, y);
            state.cursor_y -= LINE_HEIGHT;
        }
    }
}

fn render_signature(state: &mut LayoutState, ctx: &LayoutContext) {
    let options = ctx.options;
    let signer_name = non_empty(&options.signer_name);
    let signer_title = non_empty(&options.signer_title);
    let printed_name = non_empty(&options.signature_printed_name);
    let signature = ctx.assets.signature.as_ref();

    let mut block = 14.0 + 12.0 + 16.0 + 36.0;
    block += signer_name.map_or(0.0, |_| ROW_HEIGHT);
    block += signer_title.map_or(0.0, |_| LINE_HEIGHT);
    block += signature.map_or(0.0, |_| SIGNATURE_HEIGHT + 2.0);
    block += printed_name.map_or(0.0, |_| 8.0);
    state.ensure_space(ctx, block);

    state.cursor_y -= 14.0;
    let y = state.cursor_y;
    state.bold(Messages::BudgetConfirmation.msg(), LEFT, y, SECTION_TITLE_SIZE);
    state.cursor_y -= 12.0 + 16.0;
    let y = state.cursor_y;
    state.body(Messages::SignatureLine.msg(), LEFT, y);

    if let Some(name) = signer_name {
        state.cursor_y -= ROW_HEIGHT;
        let y = state.cursor_y;
        state.body(name, LEFT, y);
    }
    if let Some(title) = signer_title {
        state.cursor_y -= LINE_HEIGHT;
        let y = state.cursor_y;
        state.text(title, LEFT, y, 9.0, Weight::Regular, MUTED_TEXT_COLOR);
    }
    state.cursor_y -= 36.0;

    if let Some(signature) = signature {
        let y = state.cursor_y - SIGNATURE_HEIGHT + 8.0;
        state.push(DrawOp::Image {
            slot: ImageSlot::Signature,
            x: LEFT,
            y,
            width: SIGNATURE_HEIGHT * signature.aspect_ratio(),
            height: SIGNATURE_HEIGHT,
        });
        state.cursor_y = y - 10.0;
    }

    if let Some(name) = printed_name {
        let y = state.cursor_y;
        state.text(name, LEFT, y, 9.0, Weight::Regular, MUTED_TEXT_COLOR);
        state.cursor_y -= 8.0;
    }
}

fn render_footers(pages: &mut [Page], ctx: &LayoutContext) {
    let total = pages.len();
    let note = ctx.options.footer_note();
    for (index, page) in pages.iter_mut().enumerate() {
        page.ops.push(DrawOp::Rect {
            x: 0.0,
            y: 0.0,
            width: PAGE_WIDTH,
            height: FOOTER_HEIGHT,
            color: FOOTER_COLOR,
        });
        let footer_text = |text: String, x: f32| DrawOp::Text {
            text,
            x,
            y: FOOTER_TEXT_Y,
            size: FOOTER_TEXT_SIZE,
            weight: Weight::Regular,
            color: FOOTER_TEXT_COLOR,
        };
        if !note.is_empty() {
            page.ops.push(footer_text(note.to_owned(), LEFT));
        }
        let number = format!("{} / {total}", index + 1);
        let x = RIGHT - ctx.width(&number, FOOTER_TEXT_SIZE, Weight::Regular);
        page.ops.push(footer_text(number, x));
    }
}
