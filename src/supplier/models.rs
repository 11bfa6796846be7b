// src/supplier/models.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One driver's figures for the selected week, as read from the details panel.
///
/// Amounts keep the sign the dashboard shows: fares are positive, the service
/// fee and refunds are usually negative. `net_earnings` is computed once at
/// construction and the record never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub name: String,
    pub total_earnings: Decimal,
    pub fare: Decimal,
    pub service_fee: Decimal,
    pub other_earnings: Decimal,
    pub taxes: Decimal,
    pub tips: Decimal,
    pub refunds_expenses: Decimal,
    pub adjustments: Decimal,
    pub payout: Decimal,
    pub net_earnings: Decimal,
    pub trips: u32,
    pub distance_km: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Raw amounts read out of one details panel, before they become a record.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelAmounts {
    pub total_earnings: Decimal,
    pub fare: Decimal,
    pub service_fee: Decimal,
    pub other_earnings: Decimal,
    pub taxes: Decimal,
    pub tips: Decimal,
    pub refunds_expenses: Decimal,
    pub adjustments: Decimal,
    pub payout: Decimal,
    pub trips: u32,
    pub distance_km: Decimal,
}

impl DriverRecord {
    /// Builds a record from panel amounts. Net earnings excludes tips: the
    /// dashboard folds tips into the payout figure already, so adding them
    /// again would double-count.
    pub fn from_amounts(
        name: &str,
        amounts: PanelAmounts,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let net_earnings = amounts.total_earnings
            + amounts.refunds_expenses
            + amounts.adjustments
            + amounts.payout;
        DriverRecord {
            name: name.to_string(),
            total_earnings: amounts.total_earnings,
            fare: amounts.fare,
            service_fee: amounts.service_fee,
            other_earnings: amounts.other_earnings,
            taxes: amounts.taxes,
            tips: amounts.tips,
            refunds_expenses: amounts.refunds_expenses,
            adjustments: amounts.adjustments,
            payout: amounts.payout,
            net_earnings,
            trips: amounts.trips,
            distance_km: amounts.distance_km,
            start_date,
            end_date,
        }
    }

    /// All-zero record used when a driver's panel never became readable.
    /// Keeping the row (instead of dropping it) makes gaps visible in the
    /// report rather than silently shrinking it.
    pub fn zeroed(name: &str, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        DriverRecord::from_amounts(name, PanelAmounts::default(), start_date, end_date)
    }

    /// Total earnings rebuilt from the panel's component lines.
    /// The dashboard's own headline figure sometimes disagrees with the sum
    /// of its parts; the summary table prefers the reconstruction.
    pub fn reconstructed_total(&self) -> Decimal {
        self.fare + self.service_fee + self.other_earnings + self.taxes + self.tips
    }

    /// Net earnings rebuilt on top of `reconstructed_total`.
    pub fn reconstructed_net(&self) -> Decimal {
        self.reconstructed_total() + self.refunds_expenses + self.adjustments + self.payout
    }
}

/// The reporting period selected in the dashboard's date chip.
///
/// `display_text` is the chip's text verbatim (it may carry times of day);
/// `start`/`end` are the parsed anchors used for file names and stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub display_text: String,
}

impl DateRange {
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Spelled-out form used in report banners when the chip text is empty.
    pub fn long(&self) -> String {
        format!(
            "{} \u{2013} {}",
            self.start.format("%B %-d, %Y"),
            self.end.format("%B %-d, %Y")
        )
    }

    /// Text shown in report banners.
    pub fn label(&self) -> String {
        if self.display_text.trim().is_empty() {
            self.long()
        } else {
            self.display_text.clone()
        }
    }
}

/// Persisted login state. Cookies are kept as opaque JSON exactly as the
/// browser reported them, so protocol fields survive round-trips even when
/// this crate knows nothing about them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub saved_at: String,
    pub cookies: Vec<serde_json::Value>,
}

impl SessionState {
    pub fn new(cookies: Vec<serde_json::Value>) -> Self {
        SessionState {
            saved_at: chrono::Utc::now().to_rfc3339(),
            cookies,
        }
    }
}
