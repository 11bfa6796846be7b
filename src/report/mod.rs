// src/report/mod.rs
//
// Report assembly and output. `ReportDocument` bridges the extraction walk
// and the files on disk: records in encounter order plus the resolved week,
// written once as a styled workbook and optionally re-rendered as a PDF.
pub mod pdf;
pub mod workbook;

use tracing::debug;

use crate::supplier::models::{DateRange, DriverRecord};

/// Write-once input to the report writers.
///
/// The summary table recomputes earnings from the component lines instead
/// of trusting the dashboard's headline figure; both versions are kept and
/// any disagreement is logged here, at the single point where the records
/// become a report.
pub struct ReportDocument {
    pub records: Vec<DriverRecord>,
    pub range: Option<DateRange>,
}

impl ReportDocument {
    pub fn assemble(records: Vec<DriverRecord>, range: Option<DateRange>) -> Self {
        for rec in &records {
            let reported = rec.total_earnings;
            let rebuilt = rec.reconstructed_total();
            if reported != rebuilt {
                debug!(
                    "{:?}: reported total {} vs component sum {} (delta {})",
                    rec.name,
                    reported,
                    rebuilt,
                    reported - rebuilt
                );
            }
        }
        ReportDocument { records, range }
    }

    /// Banner text above the detail table.
    pub fn banner(&self) -> String {
        match &self.range {
            Some(r) => format!("Range: {}", r.label()),
            None => "Range: (unknown)".to_string(),
        }
    }

    /// Banner text above the summary block.
    pub fn summary_banner(&self) -> String {
        match &self.range {
            Some(r) => format!("SUMMARY - {}", r.label()),
            None => "SUMMARY - Range: (unknown)".to_string(),
        }
    }
}
