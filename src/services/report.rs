//! Deterministic PDF rendering for stock reports and inbound receipt labels
//!
//! Pure functions of their input snapshot: no storage reads, no clock, no
//! randomness. The same snapshot therefore always renders to byte-identical
//! output. Malformed input fails with a render error; rows are never
//! silently dropped.

use chrono::{DateTime, NaiveDate, Utc};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};

use crate::error::{AppError, AppResult};

const PT_PER_MM: f32 = 2.834_646;
const A4_WIDTH: f32 = 595.28;
const A4_HEIGHT: f32 = 841.89;

// Receipt labels match the stockroom's 50 x 35 mm label paper.
const LABEL_WIDTH: f32 = 50.0 * PT_PER_MM;
const LABEL_HEIGHT: f32 = 35.0 * PT_PER_MM;

const ROWS_PER_PAGE: usize = 40;
const MAX_COPIES: i64 = 200;

const FONT_REGULAR: Name = Name(b"F1");
const FONT_BOLD: Name = Name(b"F2");

/// One line of a stock report
#[derive(Debug, Clone)]
pub struct StockReportRow {
    pub reagent: String,
    pub spec: String,
    pub on_hand: i64,
    pub min_stock: Option<i64>,
}

/// Snapshot of an inbound movement for receipt rendering
#[derive(Debug, Clone)]
pub struct ReceiptSnapshot {
    pub reagent_name: String,
    pub spec: String,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub received_at: DateTime<Utc>,
    pub new_batch: bool,
}

/// Render an A4 stock report from a snapshot of inventory rows
pub fn stock_report(
    rows: &[StockReportRow],
    title: &str,
    range: Option<(NaiveDate, NaiveDate)>,
) -> AppResult<Vec<u8>> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Render("report title must not be empty".into()));
    }
    for (index, row) in rows.iter().enumerate() {
        if row.reagent.trim().is_empty() {
            return Err(AppError::Render(format!(
                "row {} is missing the reagent name",
                index + 1
            )));
        }
        if row.on_hand < 0 {
            return Err(AppError::Render(format!(
                "row {} has a negative on-hand quantity",
                index + 1
            )));
        }
    }

    let mut chunks: Vec<&[StockReportRow]> = rows.chunks(ROWS_PER_PAGE).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }
    let page_count = chunks.len();

    let mut pages = Vec::with_capacity(page_count);
    for (page_index, chunk) in chunks.iter().enumerate() {
        let mut c = Content::new();
        let mut y = A4_HEIGHT - 42.0;

        if page_index == 0 {
            text(&mut c, FONT_BOLD, 16.0, 50.0, y, title);
            y -= 18.0;
            if let Some((from, to)) = range {
                let period = format!(
                    "Period: {} to {}",
                    from.format("%Y-%m-%d"),
                    to.format("%Y-%m-%d")
                );
                text(&mut c, FONT_REGULAR, 10.0, 50.0, y, &period);
                y -= 18.0;
            }
            y -= 12.0;
        }

        text(&mut c, FONT_BOLD, 10.0, 50.0, y, "Reagent");
        text(&mut c, FONT_BOLD, 10.0, 250.0, y, "Specification");
        text(&mut c, FONT_BOLD, 10.0, 430.0, y, "On hand");
        text(&mut c, FONT_BOLD, 10.0, 500.0, y, "Min");
        c.set_line_width(0.75);
        c.move_to(50.0, y - 5.0);
        c.line_to(545.0, y - 5.0);
        c.stroke();
        y -= 22.0;

        for row in chunk.iter() {
            let min_stock = row
                .min_stock
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string());
            text(&mut c, FONT_REGULAR, 10.0, 50.0, y, &fit(&row.reagent, 36));
            text(&mut c, FONT_REGULAR, 10.0, 250.0, y, &fit(&row.spec, 32));
            text(&mut c, FONT_REGULAR, 10.0, 430.0, y, &row.on_hand.to_string());
            text(&mut c, FONT_REGULAR, 10.0, 500.0, y, &min_stock);
            y -= 16.0;
        }

        if chunk.is_empty() {
            text(&mut c, FONT_REGULAR, 10.0, 50.0, y, "(no reagents)");
        }

        let footer = format!("Page {} of {}", page_index + 1, page_count);
        text(&mut c, FONT_REGULAR, 8.0, 50.0, 40.0, &footer);

        pages.push(c.finish());
    }

    Ok(assemble(A4_WIDTH, A4_HEIGHT, &pages))
}

/// Render inbound receipt labels, one page per copy.
///
/// A new-batch receipt gets a double border and the NEW BATCH marker on the
/// first copy only; further copies carry the acceptance marker.
pub fn receipt_labels(snapshot: &ReceiptSnapshot, copies: i64) -> AppResult<Vec<u8>> {
    if snapshot.reagent_name.trim().is_empty() {
        return Err(AppError::Render(
            "receipt is missing the reagent name".into(),
        ));
    }
    if copies < 1 {
        return Err(AppError::Render("copies must be at least 1".into()));
    }
    if copies > MAX_COPIES {
        return Err(AppError::Render(format!(
            "copies must not exceed {}",
            MAX_COPIES
        )));
    }

    let reagent_line = format!("Reagent: {} ({})", snapshot.reagent_name, snapshot.spec);
    let expiry_line = format!(
        "Expiry: {}",
        snapshot
            .expiry_date
            .map(|d| d.format("%Y/%m/%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    let received_line = format!("Received: {}", snapshot.received_at.format("%Y/%m/%d"));
    let batch = snapshot.batch_number.as_deref().unwrap_or("-");

    let mut pages = Vec::with_capacity(copies as usize);
    for copy in 0..copies {
        let first_label = snapshot.new_batch && copy == 0;
        let mut c = Content::new();

        if first_label {
            c.set_line_width(2.0);
            c.rect(mm(0.5), mm(0.5), LABEL_WIDTH - mm(1.0), LABEL_HEIGHT - mm(1.0));
            c.stroke();
            c.set_line_width(0.5);
            c.rect(mm(1.5), mm(1.5), LABEL_WIDTH - mm(3.0), LABEL_HEIGHT - mm(3.0));
            c.stroke();
        } else {
            c.set_line_width(0.5);
            c.rect(mm(1.0), mm(1.0), LABEL_WIDTH - mm(2.0), LABEL_HEIGHT - mm(2.0));
            c.stroke();
        }

        let batch_line = if first_label {
            format!("Batch: {} >> NEW BATCH <<", batch)
        } else {
            format!("Batch: {} (accepted)", batch)
        };

        text(&mut c, FONT_BOLD, 10.0, mm(2.0), mm(29.0), "[ RECEIVED ]");
        text(&mut c, FONT_REGULAR, 8.0, mm(2.0), mm(25.0), &fit(&reagent_line, 40));
        text(&mut c, FONT_REGULAR, 8.0, mm(2.0), mm(21.0), &fit(&batch_line, 40));
        text(&mut c, FONT_REGULAR, 8.0, mm(2.0), mm(17.0), &expiry_line);
        text(&mut c, FONT_REGULAR, 8.0, mm(2.0), mm(13.0), &received_line);
        text(&mut c, FONT_BOLD, 10.0, mm(2.0), mm(8.0), "[ DISPENSED ]");
        text(&mut c, FONT_REGULAR, 8.0, mm(2.0), mm(4.0), "By:");
        text(&mut c, FONT_REGULAR, 8.0, mm(25.0), mm(4.0), "Date:");

        pages.push(c.finish());
    }

    Ok(assemble(LABEL_WIDTH, LABEL_HEIGHT, &pages))
}

fn assemble(page_width: f32, page_height: f32, pages: &[Vec<u8>]) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let regular_id = Ref::new(3);
    let bold_id = Ref::new(4);

    let mut next = 5;
    let mut page_ids = Vec::with_capacity(pages.len());
    let mut content_ids = Vec::with_capacity(pages.len());
    for _ in pages {
        page_ids.push(Ref::new(next));
        content_ids.push(Ref::new(next + 1));
        next += 2;
    }

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(pages.len() as i32);
    pdf.type1_font(regular_id).base_font(Name(b"Helvetica"));
    pdf.type1_font(bold_id).base_font(Name(b"Helvetica-Bold"));

    for ((page_id, content_id), content) in page_ids.iter().zip(&content_ids).zip(pages) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, page_width, page_height));
        page.parent(tree_id);
        page.contents(*content_id);
        {
            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            fonts.pair(FONT_REGULAR, regular_id);
            fonts.pair(FONT_BOLD, bold_id);
        }
        page.finish();
        pdf.stream(*content_id, content);
    }

    pdf.finish()
}

fn text(c: &mut Content, font: Name, size: f32, x: f32, y: f32, s: &str) {
    let safe = sanitize(s);
    c.begin_text();
    c.set_font(font, size);
    c.next_line(x, y);
    c.show(Str(safe.as_bytes()));
    c.end_text();
}

fn mm(value: f32) -> f32 {
    value * PT_PER_MM
}

// Helvetica has no glyphs outside WinAnsi; anything else renders as '?'.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

fn fit(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}
