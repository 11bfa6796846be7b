// src/report/pdf.rs
//
// PDF export. The workbook's cells are read back from disk and rebuilt as
// a styled HTML table for the browser to print, so the PDF always shows
// what the spreadsheet actually says, not what memory thinks it said.
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use headless_chrome::types::PrintToPdfOptions;

use crate::report::workbook::{DETAIL_HEADERS, SHEET_NAME};
use crate::utils::error::ReportError;

const HTML_HEAD: &str = r#"<html>
<head>
  <style>
    body { font-family: Arial, sans-serif; margin: 20px; font-size: 12px; }
    .banner { font-size: 16px; font-weight: bold; margin-bottom: 20px; color: #333; }
    table { width: 100%; border-collapse: collapse; margin-top: 10px; }
    th, td { border: 1px solid #ddd; padding: 6px; text-align: left; font-size: 10px; }
    th { background-color: #f2f2f2; font-weight: bold; text-align: center; }
    .totals { background-color: #d3d3d3; font-weight: bold; }
    .payout { background-color: #ffff99; }
    .alternate { background-color: #f8f8f8; }
  </style>
</head>
<body>
"#;

/// The PDF lands next to the workbook, same stem.
pub fn pdf_path(workbook_path: &Path) -> PathBuf {
    workbook_path.with_extension("pdf")
}

/// Print settings for the report table: A3 landscape with slim margins.
/// Backgrounds are kept so the payout and totals fills survive into the PDF.
pub fn print_options() -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(true),
        print_background: Some(true),
        paper_width: Some(11.69),
        paper_height: Some(16.54),
        margin_top: Some(0.16),
        margin_bottom: Some(0.16),
        margin_left: Some(0.16),
        margin_right: Some(0.16),
        ..Default::default()
    }
}

/// Reads the report sheet back as an absolute row-by-column grid, padded
/// to the detail table's width.
pub fn load_sheet(path: &Path) -> Result<Vec<Vec<Data>>, ReportError> {
    let mut wb: Xlsx<_> =
        open_workbook(path).map_err(|e: XlsxError| ReportError::ReadBack(e.to_string()))?;
    let range = match wb.worksheet_range(SHEET_NAME) {
        Ok(range) => range,
        Err(XlsxError::WorksheetNotFound(_)) => {
            return Err(ReportError::MissingSheet(SHEET_NAME.to_string()));
        }
        Err(e) => return Err(ReportError::ReadBack(e.to_string())),
    };

    let height = range.end().map_or(0, |(r, _)| r as usize + 1);
    let grid = (0..height)
        .map(|r| {
            (0..DETAIL_HEADERS.len())
                .map(|c| {
                    range
                        .get_value((r as u32, c as u32))
                        .cloned()
                        .unwrap_or(Data::Empty)
                })
                .collect()
        })
        .collect();
    Ok(grid)
}

/// Rebuilds the sheet as the HTML document the PDF is printed from.
///
/// Everything below the banner and header rows is rendered: data, totals
/// and the summary block alike. Rows whose first cell says TOTAL get the
/// totals styling; zebra striping counts only the rows that are not.
pub fn render_html(grid: &[Vec<Data>]) -> String {
    let banner = grid
        .first()
        .and_then(|row| row.first())
        .and_then(cell_text)
        .unwrap_or_else(|| SHEET_NAME.to_string());

    let mut html = String::from(HTML_HEAD);
    html.push_str(&format!("<div class=\"banner\">{}</div>\n", escape(&banner)));
    html.push_str("<table>\n<tr>");
    for header in DETAIL_HEADERS {
        html.push_str(&format!("<th>{}</th>", escape(header)));
    }
    html.push_str("</tr>\n");

    let mut stripe = 0usize;
    for row in grid.iter().skip(2) {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let is_totals = matches!(row.first(), Some(Data::String(s)) if s.contains("TOTAL"));
        let row_class = if is_totals {
            "totals"
        } else if stripe % 2 == 1 {
            "alternate"
        } else {
            ""
        };
        html.push_str(&format!("<tr class=\"{}\">", row_class));
        for col in 0..DETAIL_HEADERS.len() {
            let cell = row.get(col).unwrap_or(&Data::Empty);
            let class = if col == 9 && !is_totals { "payout" } else { "" };
            html.push_str(&format!(
                "<td class=\"{}\">{}</td>",
                class,
                format_cell(cell, col)
            ));
        }
        html.push_str("</tr>\n");
        if !is_totals {
            stripe += 1;
        }
    }
    html.push_str("</table></body></html>\n");
    html
}

// Empty cells zero-fill in numeric columns and stay empty in the name
// column, so a padded summary row still lines up under the 13 headers.
fn format_cell(cell: &Data, col: usize) -> String {
    match cell {
        Data::String(s) if !s.is_empty() => escape(s),
        Data::Float(f) => format_number(*f, col),
        Data::Int(i) => format_number(*i as f64, col),
        _ if col == 0 => String::new(),
        _ => format_number(0.0, col),
    }
}

// Trips render whole, distance with two decimals, everything else as money.
fn format_number(value: f64, col: usize) -> String {
    match col {
        0 => value.to_string(),
        11 => format!("{}", value.round() as i64),
        12 => format!("{:.2}", value),
        _ => format_money(value),
    }
}

fn format_money(value: f64) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if negative { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    fn row13(cells: Vec<Data>) -> Vec<Data> {
        let mut cells = cells;
        cells.resize(13, Data::Empty);
        cells
    }

    #[test]
    fn test_money_grouping() {
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(7.5), "7.50");
        assert_eq!(format_money(1234.5), "1,234.50");
        assert_eq!(format_money(1234567.891), "1,234,567.89");
        assert_eq!(format_money(-1100.0), "-1,100.00");
    }

    #[test]
    fn test_render_zero_fills_and_classes() {
        let grid = vec![
            row13(vec![text("Range: test week")]),
            row13(vec![text("Driver")]),
            row13(vec![text("Ayesha"), Data::Float(1200.0)]),
        ];
        let html = render_html(&grid);
        assert!(html.contains("<div class=\"banner\">Range: test week</div>"));
        assert!(html.contains("<td class=\"\">Ayesha</td>"));
        assert!(html.contains("1,200.00"));
        // Payout column zero-filled and highlighted on a data row.
        assert!(html.contains("<td class=\"payout\">0.00</td>"));
        // Trips column zero-fills as a whole number.
        assert!(html.contains("<td class=\"\">0</td>"));
    }

    #[test]
    fn test_render_totals_row_class() {
        let grid = vec![
            row13(vec![text("Range: x")]),
            row13(vec![text("Driver")]),
            row13(vec![text("TOTALS"), Data::Float(10.0)]),
        ];
        let html = render_html(&grid);
        assert!(html.contains("<tr class=\"totals\">"));
        // Totals rows never get the payout highlight.
        assert!(!html.contains("<td class=\"payout\">"));
    }

    #[test]
    fn test_render_skips_blank_rows_and_stripes_the_rest() {
        let blank = row13(vec![]);
        let grid = vec![
            row13(vec![text("Range: x")]),
            row13(vec![text("Driver")]),
            row13(vec![text("A"), Data::Float(1.0)]),
            row13(vec![text("B"), Data::Float(2.0)]),
            blank,
            row13(vec![text("TOTALS"), Data::Float(3.0)]),
            row13(vec![text("C"), Data::Float(4.0)]),
        ];
        let html = render_html(&grid);
        // A=stripe 0 plain, B=stripe 1 alternate, totals skipped, C=stripe 2 plain.
        assert_eq!(html.matches("<tr class=\"alternate\">").count(), 1);
        assert_eq!(html.matches("<tr class=\"totals\">").count(), 1);
        assert!(html.contains("<td class=\"\">C</td>"));
    }

    #[test]
    fn test_trips_and_distance_column_formats() {
        let mut cells = vec![text("A")];
        cells.extend((0..10).map(|_| Data::Float(1.0)));
        cells.push(Data::Float(23.0)); // trips
        cells.push(Data::Float(310.5)); // distance
        let grid = vec![row13(vec![text("b")]), row13(vec![text("h")]), cells];
        let html = render_html(&grid);
        assert!(html.contains("<td class=\"\">23</td>"));
        assert!(html.contains("<td class=\"\">310.50</td>"));
    }

    #[test]
    fn test_escape_in_names() {
        let grid = vec![
            row13(vec![text("Range: x")]),
            row13(vec![text("Driver")]),
            row13(vec![text("A & B <Cars>")]),
        ];
        let html = render_html(&grid);
        assert!(html.contains("A &amp; B &lt;Cars&gt;"));
    }

    #[test]
    fn test_pdf_path_swaps_extension() {
        assert_eq!(
            pdf_path(Path::new("/tmp/Report-2025-09-01-to-2025-09-07.xlsx")),
            PathBuf::from("/tmp/Report-2025-09-01-to-2025-09-07.pdf")
        );
    }
}
