use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use printpdf::{BuiltinFont, Mm, PdfDocument};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::ReportRow;
use crate::reports::ReportFilter;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const TITLE_SIZE_PT: f32 = 16.0;
const LINE_SIZE_PT: f32 = 11.0;
const LINE_HEIGHT_MM: f32 = 7.0;
const TITLE_GAP_MM: f32 = 12.0;
const PT_TO_MM: f32 = 0.3528;
/// Average advance of a glyph relative to the font size, used to place
/// right-aligned text without shaping.
const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

pub const LINES_PER_PAGE: usize = 34;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportFont {
    Builtin,
    TrueType(PathBuf),
}

impl ReportFont {
    pub fn from_config(path: Option<&PathBuf>) -> Self {
        match path {
            Some(path) => ReportFont::TrueType(path.clone()),
            None => ReportFont::Builtin,
        }
    }
}

/// The text of an exported report split into pages. The title is printed
/// above the first page's lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub title: String,
    pub pages: Vec<Vec<String>>,
}

pub fn format_row(row: &ReportRow) -> String {
    format!(
        "{} – {} – {}",
        row.date.format("%Y-%m-%d"),
        row.student_name,
        row.status
    )
}

pub fn report_title(base: &str, filter: &ReportFilter) -> String {
    match (filter.start, filter.end) {
        (Some(start), Some(end)) => format!("{} ({} – {})", base, start, end),
        (Some(start), None) => format!("{} ({} –)", base, start),
        (None, Some(end)) => format!("{} (– {})", base, end),
        (None, None) => base.to_string(),
    }
}

impl ReportLayout {
    pub fn paginate(title: &str, rows: &[ReportRow], lines_per_page: usize) -> Self {
        let lines: Vec<String> = rows.iter().map(format_row).collect();

        let mut pages: Vec<Vec<String>> = lines
            .chunks(lines_per_page.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();

        if pages.is_empty() {
            pages.push(Vec::new());
        }

        Self {
            title: title.to_string(),
            pages,
        }
    }

    pub fn line_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    fn all_text(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str())
            .chain(self.pages.iter().flatten().map(String::as_str))
    }
}

/// Whether the character exists in WinAnsiEncoding, the only encoding the
/// built-in PDF fonts support.
fn is_win_ansi(c: char) -> bool {
    const EXTRA: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";
    matches!(c as u32, 0x20..=0x7E | 0xA0..=0xFF) || EXTRA.contains(c)
}

fn right_aligned_x(text: &str, size_pt: f32) -> Mm {
    let width = text.chars().count() as f32 * size_pt * AVERAGE_GLYPH_WIDTH * PT_TO_MM;
    Mm((PAGE_WIDTH_MM - MARGIN_MM - width).max(MARGIN_MM))
}

#[instrument(skip(layout), fields(pages = layout.pages.len(), lines = layout.line_count()))]
pub fn render_pdf(layout: &ReportLayout, font: &ReportFont) -> Result<Vec<u8>, AppError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        layout.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Page 1",
    );

    let font_ref = match font {
        ReportFont::Builtin => {
            if let Some(c) = layout.all_text().flat_map(str::chars).find(|c| !is_win_ansi(*c)) {
                return Err(AppError::Export(format!(
                    "character '{}' cannot be encoded with the built-in font; configure report_font",
                    c
                )));
            }
            doc.add_builtin_font(BuiltinFont::Helvetica)?
        }
        ReportFont::TrueType(path) => {
            let file = File::open(path).map_err(|e| {
                AppError::Export(format!("cannot open font {}: {}", path.display(), e))
            })?;
            doc.add_external_font(BufReader::new(file))?
        }
    };

    let mut page_indices = vec![(first_page, first_layer)];
    for number in 2..=layout.pages.len() {
        page_indices.push(doc.add_page(
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            format!("Page {}", number),
        ));
    }

    for (index, ((page, layer), lines)) in page_indices.into_iter().zip(&layout.pages).enumerate() {
        let current = doc.get_page(page).get_layer(layer);
        let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

        if index == 0 {
            current.use_text(
                layout.title.as_str(),
                TITLE_SIZE_PT,
                right_aligned_x(&layout.title, TITLE_SIZE_PT),
                Mm(y),
                &font_ref,
            );
            y -= TITLE_GAP_MM;
        }

        for line in lines {
            current.use_text(
                line.as_str(),
                LINE_SIZE_PT,
                right_aligned_x(line, LINE_SIZE_PT),
                Mm(y),
                &font_ref,
            );
            y -= LINE_HEIGHT_MM;
        }
    }

    let bytes = doc.save_to_bytes()?;
    info!(bytes = bytes.len(), "Rendered PDF report");
    Ok(bytes)
}
