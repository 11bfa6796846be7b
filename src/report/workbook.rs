// src/report/workbook.rs
//
// The xlsx writer. Layout matches the sheet the fleet office already
// works with: a merged range banner, the 13-column detail table with a
// totals row, then the reconciliation summary block further down.
use std::path::{Path, PathBuf};

use chrono::Local;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::info;

use crate::report::ReportDocument;
use crate::supplier::models::{DateRange, DriverRecord};
use crate::utils::error::ReportError;

pub const SHEET_NAME: &str = "Weekly Earnings Report";

pub const DETAIL_HEADERS: [&str; 13] = [
    "Driver",
    "Total Earnings",
    "Fare",
    "Service Fee",
    "Other Earnings",
    "Taxes",
    "Tips",
    "Refunds & Expenses",
    "Adjustments",
    "Payout",
    "Net Earnings",
    "Trips",
    "Distance (km)",
];
const DETAIL_WIDTHS: [f64; 13] = [
    30.0, 16.0, 14.0, 14.0, 16.0, 12.0, 12.0, 18.0, 15.0, 15.0, 16.0, 10.0, 15.0,
];

pub const SUMMARY_HEADERS: [&str; 8] = [
    "NAMES",
    "TOTAL EARNINGS",
    "REFUNDS/EXPENSES",
    "ADJUSTMENTS",
    "PAYOUT",
    "NET EARNINGS",
    "TOTAL TRIPS",
    "TIPS",
];
const SUMMARY_WIDTHS: [f64; 8] = [25.0, 16.0, 18.0, 15.0, 15.0, 16.0, 12.0, 12.0];

const MONEY_NUM_FMT: &str = "#,##0.00";
const DISTANCE_NUM_FMT: &str = "0.00";

const BANNER_FILL: u32 = 0xDBEEF4;
const HEADER_FILL: u32 = 0xE6E6FA;
const ZEBRA_FILL: u32 = 0xF8F8F8;
const PAYOUT_FILL: u32 = 0xFFFF00;
const TOTALS_FILL: u32 = 0xD3D3D3;
const SUMMARY_BANNER_FILL: u32 = 0xECEEDF;
const SUMMARY_HEADER_FILL: u32 = 0xD9E2F3;
const SUMMARY_PAYOUT_FILL: u32 = 0xF8FAB4;

/// `Report-{start}-to-{end}.xlsx` for a resolved week, `Report-{today}.xlsx`
/// otherwise.
pub fn file_name(range: Option<&DateRange>) -> String {
    match range {
        Some(r) => format!("Report-{}-to-{}.xlsx", r.start_iso(), r.end_iso()),
        None => format!("Report-{}.xlsx", Local::now().format("%Y-%m-%d")),
    }
}

/// Writes the workbook into `out_dir` and returns the file's path.
pub fn write(doc: &ReportDocument, out_dir: &Path) -> Result<PathBuf, ReportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    // Summary widths only ever grow a column the detail table already sized.
    for (col, width) in DETAIL_WIDTHS.iter().enumerate() {
        let width = SUMMARY_WIDTHS.get(col).map_or(*width, |s| s.max(*width));
        sheet.set_column_width(col as u16, width)?;
    }

    let totals_row = write_detail(sheet, doc)?;
    write_summary(sheet, doc, totals_row + 3)?;

    sheet.set_freeze_panes(1, 0)?;

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(file_name(doc.range.as_ref()));
    workbook.save(&path)?;
    info!(
        "Report written to {} ({} drivers)",
        path.display(),
        doc.records.len()
    );
    Ok(path)
}

// Banner, headers, data rows and the totals row. Returns the totals row
// index. Borders cover banner through data; the totals row stands apart on
// its gray fill alone.
fn write_detail(sheet: &mut Worksheet, doc: &ReportDocument) -> Result<u32, ReportError> {
    let banner_fmt = Format::new()
        .set_bold()
        .set_align(FormatAlign::Left)
        .set_background_color(Color::RGB(BANNER_FILL))
        .set_border(FormatBorder::Thin);
    sheet.merge_range(0, 0, 0, 12, &doc.banner(), &banner_fmt)?;

    let header_fmt = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin);
    for (col, header) in DETAIL_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(1, col as u16, *header, &header_fmt)?;
    }

    let text_plain = Format::new().set_border(FormatBorder::Thin);
    let text_zebra = text_plain.clone().set_background_color(Color::RGB(ZEBRA_FILL));
    let money_plain = text_plain.clone().set_num_format(MONEY_NUM_FMT);
    let money_zebra = money_plain.clone().set_background_color(Color::RGB(ZEBRA_FILL));
    let payout_fmt = money_plain.clone().set_background_color(Color::RGB(PAYOUT_FILL));
    let dist_plain = text_plain.clone().set_num_format(DISTANCE_NUM_FMT);
    let dist_zebra = dist_plain.clone().set_background_color(Color::RGB(ZEBRA_FILL));

    let mut row: u32 = 2;
    for (idx, rec) in doc.records.iter().enumerate() {
        let zebra = idx % 2 == 1;
        let text_fmt = if zebra { &text_zebra } else { &text_plain };
        let money_fmt = if zebra { &money_zebra } else { &money_plain };
        let dist_fmt = if zebra { &dist_zebra } else { &dist_plain };

        sheet.write_string_with_format(row, 0, &rec.name, text_fmt)?;
        let money = [
            rec.total_earnings,
            rec.fare,
            rec.service_fee,
            rec.other_earnings,
            rec.taxes,
            rec.tips,
            rec.refunds_expenses,
            rec.adjustments,
        ];
        for (i, amount) in money.iter().enumerate() {
            sheet.write_number_with_format(row, (i + 1) as u16, to_f64(*amount), money_fmt)?;
        }
        sheet.write_number_with_format(row, 9, to_f64(rec.payout), &payout_fmt)?;
        sheet.write_number_with_format(row, 10, to_f64(rec.net_earnings), money_fmt)?;
        sheet.write_number_with_format(row, 11, rec.trips, text_fmt)?;
        sheet.write_number_with_format(row, 12, to_f64(rec.distance_km), dist_fmt)?;
        row += 1;
    }

    // One blank row, then totals.
    let totals_row = row + 1;
    let totals_text = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(TOTALS_FILL));
    let totals_money = totals_text.clone().set_num_format(MONEY_NUM_FMT);
    let totals_dist = totals_text.clone().set_num_format(DISTANCE_NUM_FMT);

    sheet.write_string_with_format(totals_row, 0, "TOTALS", &totals_text)?;
    let sums = [
        sum(doc, |r| r.total_earnings),
        sum(doc, |r| r.fare),
        sum(doc, |r| r.service_fee),
        sum(doc, |r| r.other_earnings),
        sum(doc, |r| r.taxes),
        sum(doc, |r| r.tips),
        sum(doc, |r| r.refunds_expenses),
        sum(doc, |r| r.adjustments),
        sum(doc, |r| r.payout),
        sum(doc, |r| r.net_earnings),
    ];
    for (i, total) in sums.iter().enumerate() {
        sheet.write_number_with_format(totals_row, (i + 1) as u16, to_f64(*total), &totals_money)?;
    }
    let trips_total: u32 = doc.records.iter().map(|r| r.trips).sum();
    sheet.write_number_with_format(totals_row, 11, trips_total, &totals_text)?;
    sheet.write_number_with_format(
        totals_row,
        12,
        to_f64(sum(doc, |r| r.distance_km)),
        &totals_dist,
    )?;

    Ok(totals_row)
}

// The reconciliation block: banner, headers, per-driver rows rebuilt from
// component amounts, one blank row, totals. Every cell in the block gets a
// border, the blank spacer row included.
fn write_summary(sheet: &mut Worksheet, doc: &ReportDocument, start: u32) -> Result<(), ReportError> {
    let banner_fmt = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(SUMMARY_BANNER_FILL))
        .set_border(FormatBorder::Thin);
    sheet.merge_range(start, 0, start, 6, &doc.summary_banner(), &banner_fmt)?;

    let blank_fmt = Format::new().set_border(FormatBorder::Thin);
    sheet.write_blank(start, 7, &blank_fmt)?;

    let header_fmt = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(SUMMARY_HEADER_FILL))
        .set_border(FormatBorder::Thin);
    for (col, header) in SUMMARY_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(start + 1, col as u16, *header, &header_fmt)?;
    }

    let text_plain = Format::new().set_border(FormatBorder::Thin);
    let text_zebra = text_plain.clone().set_background_color(Color::RGB(ZEBRA_FILL));
    let money_plain = text_plain.clone().set_num_format(MONEY_NUM_FMT);
    let money_zebra = money_plain.clone().set_background_color(Color::RGB(ZEBRA_FILL));
    let payout_fmt = money_plain
        .clone()
        .set_background_color(Color::RGB(SUMMARY_PAYOUT_FILL));

    let mut row = start + 2;
    for (idx, rec) in doc.records.iter().enumerate() {
        // Zebra never touches the payout column; its own fill wins.
        let zebra = idx % 2 == 1;
        let text_fmt = if zebra { &text_zebra } else { &text_plain };
        let money_fmt = if zebra { &money_zebra } else { &money_plain };

        sheet.write_string_with_format(row, 0, &rec.name, text_fmt)?;
        sheet.write_number_with_format(row, 1, to_f64(rec.reconstructed_total()), money_fmt)?;
        sheet.write_number_with_format(row, 2, to_f64(rec.refunds_expenses), money_fmt)?;
        sheet.write_number_with_format(row, 3, to_f64(rec.adjustments), money_fmt)?;
        sheet.write_number_with_format(row, 4, to_f64(rec.payout), &payout_fmt)?;
        sheet.write_number_with_format(row, 5, to_f64(rec.reconstructed_net()), money_fmt)?;
        sheet.write_number_with_format(row, 6, rec.trips, text_fmt)?;
        sheet.write_number_with_format(row, 7, to_f64(rec.tips), money_fmt)?;
        row += 1;
    }

    for col in 0..SUMMARY_HEADERS.len() {
        sheet.write_blank(row, col as u16, &blank_fmt)?;
    }

    let totals_row = row + 1;
    let totals_text = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(TOTALS_FILL))
        .set_border(FormatBorder::Thin);
    let totals_money = totals_text.clone().set_num_format(MONEY_NUM_FMT);

    sheet.write_string_with_format(totals_row, 0, "TOTALS", &totals_text)?;
    let rebuilt_total: Decimal = doc.records.iter().map(|r| r.reconstructed_total()).sum();
    let rebuilt_net: Decimal = doc.records.iter().map(|r| r.reconstructed_net()).sum();
    sheet.write_number_with_format(totals_row, 1, to_f64(rebuilt_total), &totals_money)?;
    sheet.write_number_with_format(totals_row, 2, to_f64(sum(doc, |r| r.refunds_expenses)), &totals_money)?;
    sheet.write_number_with_format(totals_row, 3, to_f64(sum(doc, |r| r.adjustments)), &totals_money)?;
    sheet.write_number_with_format(totals_row, 4, to_f64(sum(doc, |r| r.payout)), &totals_money)?;
    sheet.write_number_with_format(totals_row, 5, to_f64(rebuilt_net), &totals_money)?;
    let trips_total: u32 = doc.records.iter().map(|r| r.trips).sum();
    sheet.write_number_with_format(totals_row, 6, trips_total, &totals_text)?;
    sheet.write_number_with_format(totals_row, 7, to_f64(sum(doc, |r| r.tips)), &totals_money)?;

    Ok(())
}

fn sum(doc: &ReportDocument, field: fn(&DriverRecord) -> Decimal) -> Decimal {
    doc.records.iter().map(field).sum()
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_file_name_with_range() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 9, 7).unwrap(),
            display_text: String::new(),
        };
        assert_eq!(
            file_name(Some(&range)),
            "Report-2025-09-01-to-2025-09-07.xlsx"
        );
    }

    #[test]
    fn test_file_name_without_range() {
        let name = file_name(None);
        assert!(name.starts_with("Report-"));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(name.len(), "Report-2025-01-01.xlsx".len());
    }
}
