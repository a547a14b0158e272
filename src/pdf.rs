use crate::apportionment::{Apportionment, Liquidation, apportion};
use crate::billing::{BillingPeriod, SubUnit};
use crate::document::LiquidationDocument;
use bigdecimal::BigDecimal;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MIME_TYPE: &str = "application/pdf";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const ROW_HEIGHT: f32 = 8.0;
const COLUMN_WIDTHS: [f32; 4] = [50.0, 40.0, 40.0, 60.0];
const CELL_PADDING: f32 = 2.0;
/// Top of the table on the first page, below the title and bill summary.
const FIRST_TABLE_TOP: f32 = 235.0;
const NEXT_TABLE_TOP: f32 = PAGE_HEIGHT - MARGIN;

const PT_TO_MM: f32 = 0.3528;
/// Rough Helvetica advance, as a fraction of the font size.
const AVERAGE_GLYPH_WIDTH: f32 = 0.52;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: sub-unit meters add up to {total_measured_volume}")]
    Indeterminate { total_measured_volume: BigDecimal },
    #[error("failed to render PDF: {0}")]
    Pdf(String),
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn file_name(period: &BillingPeriod) -> String {
    format!("Liquidation_{}.pdf", period.label())
}

/// Recomputes the liquidation and writes it into `dir`, returning the file's path.
/// Nothing is written when the readings cannot be apportioned.
pub fn export_liquidation(
    dir: &Path,
    period: &BillingPeriod,
    units: &[SubUnit],
) -> Result<PathBuf, ExportError> {
    let liquidation = match apportion(period, units) {
        Apportionment::Settled(liquidation) => liquidation,
        Apportionment::Indeterminate {
            total_measured_volume,
        } => {
            return Err(ExportError::Indeterminate {
                total_measured_volume,
            });
        }
    };
    write_liquidation(dir, period, &liquidation)
}

pub fn write_liquidation(
    dir: &Path,
    period: &BillingPeriod,
    liquidation: &Liquidation,
) -> Result<PathBuf, ExportError> {
    let bytes = render(&LiquidationDocument::new(period, liquidation))?;
    let path = dir.join(file_name(period));
    fs::write(&path, bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

pub fn render(document: &LiquidationDocument) -> Result<Vec<u8>, ExportError> {
    let (pdf, page, layer) = PdfDocument::new(
        document.title.as_str(),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Page 1",
    );
    let regular = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let bold = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    {
        let mut writer = PageWriter {
            pdf: &pdf,
            layer: pdf.get_page(page).get_layer(layer),
            regular,
            bold,
            pages: 1,
        };
        writer.heading(document);

        for (index, rows) in paginate(document.rows.len()).into_iter().enumerate() {
            let top = if index == 0 {
                FIRST_TABLE_TOP
            } else {
                writer.next_page();
                NEXT_TABLE_TOP
            };
            writer.header_row(top, &document.header);
            for (offset, row) in document.rows[rows].iter().enumerate() {
                let row_top = top - ROW_HEIGHT * (offset as f32 + 1.0);
                writer.row(row_top, row);
            }
        }
    }

    pdf.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
}

fn rows_fitting(table_top: f32) -> usize {
    // One row of space goes to the repeated header.
    (((table_top - MARGIN) / ROW_HEIGHT).floor() as usize).saturating_sub(1)
}

/// Splits the table's rows into per-page ranges. Always yields at least one page.
fn paginate(rows: usize) -> Vec<Range<usize>> {
    let mut pages = Vec::new();
    let mut start = 0;
    let mut capacity = rows_fitting(FIRST_TABLE_TOP);
    loop {
        let end = (start + capacity).min(rows);
        pages.push(start..end);
        if end >= rows {
            return pages;
        }
        start = end;
        capacity = rows_fitting(NEXT_TABLE_TOP);
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * AVERAGE_GLYPH_WIDTH
}

/// Cuts `text` down so it stays inside a cell of the given width.
fn fit(text: &str, width: f32, size: f32) -> String {
    let room = width - 2.0 * CELL_PADDING;
    if text_width(text, size) <= room {
        return text.to_string();
    }
    let per_char = size * PT_TO_MM * AVERAGE_GLYPH_WIDTH;
    let keep = ((room / per_char) as usize).saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn header_fill() -> Color {
    Color::Rgb(Rgb::new(200.0 / 255.0, 220.0 / 255.0, 1.0, None))
}

struct PageWriter<'a> {
    pdf: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    pages: usize,
}

impl PageWriter<'_> {
    fn next_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.pdf.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Page {}", self.pages),
        );
        self.layer = self.pdf.get_page(page).get_layer(layer);
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn heading(&self, document: &LiquidationDocument) {
        let title_x = ((PAGE_WIDTH - text_width(&document.title, 16.0)) / 2.0).max(MARGIN);
        self.text(&document.title, 16.0, title_x, PAGE_HEIGHT - 20.0, true);

        let mut y = PAGE_HEIGHT - 37.0;
        self.text(document.summary_heading, 12.0, MARGIN, y, true);
        let half = (PAGE_WIDTH - 2.0 * MARGIN) / 2.0;
        for pair in document.summary.chunks(2) {
            y -= 7.0;
            for (column, (label, value)) in pair.iter().enumerate() {
                let x = MARGIN + half * column as f32;
                self.text(&format!("{label}: {value}"), 10.0, x, y, false);
            }
        }
    }

    fn header_row(&self, top: f32, header: &[&str; 4]) {
        let mut x = MARGIN;
        for (title, width) in header.iter().zip(COLUMN_WIDTHS) {
            self.layer.set_fill_color(header_fill());
            self.layer
                .add_rect(Rect::new(Mm(x), Mm(top - ROW_HEIGHT), Mm(x + width), Mm(top)));
            self.layer.set_fill_color(black());
            self.cell(x, top, width, title, true);
            x += width;
        }
    }

    fn row(&self, top: f32, cells: &[String; 4]) {
        let mut x = MARGIN;
        for (cell, width) in cells.iter().zip(COLUMN_WIDTHS) {
            self.cell(x, top, width, cell, false);
            x += width;
        }
    }

    fn cell(&self, x: f32, top: f32, width: f32, text: &str, bold: bool) {
        let bottom = top - ROW_HEIGHT;
        let corners = [(x, bottom), (x + width, bottom), (x + width, top), (x, top)];
        self.layer.set_outline_color(black());
        self.layer.set_outline_thickness(0.2);
        self.layer.add_line(Line {
            points: corners
                .iter()
                .map(|&(px, py)| (Point::new(Mm(px), Mm(py)), false))
                .collect(),
            is_closed: true,
        });
        self.text(
            &fit(text, width, 10.0),
            10.0,
            x + CELL_PADDING,
            bottom + 2.5,
            bold,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::Month;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn period() -> BillingPeriod {
        BillingPeriod::new(Month::October, dec("250"), dec("100"), dec("2.5")).unwrap()
    }

    #[test]
    fn names_file_after_period() {
        assert_eq!(file_name(&period()), "Liquidation_October.pdf");
        assert_eq!(MIME_TYPE, "application/pdf");
    }

    #[test]
    fn short_tables_fit_one_page() {
        assert_eq!(paginate(0), vec![0..0]);
        assert_eq!(paginate(5), vec![0..5]);
        let first = rows_fitting(FIRST_TABLE_TOP);
        assert_eq!(paginate(first), vec![0..first]);
    }

    #[test]
    fn long_tables_continue_on_new_pages() {
        let first = rows_fitting(FIRST_TABLE_TOP);
        let next = rows_fitting(NEXT_TABLE_TOP);
        assert!(next > first);
        let total = first + next + 3;
        assert_eq!(
            paginate(total),
            vec![0..first, first..first + next, first + next..total]
        );
    }

    #[test]
    fn long_names_are_cut_to_the_cell() {
        assert_eq!(fit("Shop", 50.0, 10.0), "Shop");
        let cut = fit(&"Very long unit name ".repeat(5), 50.0, 10.0);
        assert!(cut.ends_with("..."));
        assert!(text_width(&cut, 10.0) <= 50.0 - 2.0 * CELL_PADDING);
    }

    #[test]
    fn exports_pdf_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let units: Vec<SubUnit> = (1..=60)
            .map(|i| SubUnit::new(format!("Unit {i}"), dec("0"), BigDecimal::from(i)).unwrap())
            .collect();
        let path = export_liquidation(dir.path(), &period(), &units).unwrap();
        assert_eq!(path, dir.path().join("Liquidation_October.pdf"));
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn refuses_to_export_without_consumption() {
        let dir = tempfile::tempdir().unwrap();
        let units = [SubUnit::new("Idle", dec("4"), dec("4")).unwrap()];
        let err = export_liquidation(dir.path(), &period(), &units).unwrap_err();
        assert!(matches!(err, ExportError::Indeterminate { .. }));
        assert!(!dir.path().join("Liquidation_October.pdf").exists());
    }
}
