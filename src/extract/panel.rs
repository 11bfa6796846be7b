// src/extract/panel.rs
//
// Pure analysis of the driver details panel. Everything here reads a parsed
// snapshot and either extracts values or plans clicks (as css paths) for the
// driver to perform; nothing in this module touches the live page.
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use crate::extract::dom;
use crate::extract::{dom::collect_text, money, Field};

// --- Panel Location ---

// Candidate containers, most specific first. The dashboard renders the
// details drawer with BaseWeb, but older layouts used a plain dialog.
static PANEL_DRAWER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-baseweb="drawer"]"#).expect("valid drawer selector"));
static PANEL_MODAL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[role="dialog"][aria-modal="true"]"#).expect("valid modal selector")
});
static PANEL_DIALOG: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[role="dialog"]"#).expect("valid dialog selector"));

// A real details panel talks about earnings; overlays that merely share the
// container markup (filters, toasts) do not.
static PANEL_VOCAB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Total earnings|Payout|Trips").expect("valid vocab pattern"));

// --- Field Labels ---
//
// Anchored and case-insensitive: "Tips" must not match the "Trips" line, and
// a section header must not match the rows under it.
pub static TOTAL_EARNINGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(Total earnings)$").expect("valid label pattern"));
pub static FARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Fare$").expect("valid label pattern"));
pub static SERVICE_FEE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Service\s*Fee$").expect("valid label pattern"));
pub static OTHER_EARNINGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Other\s*earnings$").expect("valid label pattern"));
pub static TAXES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Taxes?$").expect("valid label pattern"));
pub static TIPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^Tip$").expect("valid label pattern"));
pub static REFUNDS_EXPENSES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Refunds\s*&\s*Expenses$").expect("valid label pattern"));
pub static ADJUSTMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(Adjustments from previous periods|Adjustments)$").expect("valid label pattern")
});
pub static PAYOUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Payout$").expect("valid label pattern"));

static TRIPS_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Trips\s*(\d+)").expect("valid trips pattern"));
static DISTANCE_KM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s*km").expect("valid distance pattern"));

/// Finds the open details panel in a snapshot.
///
/// Containers are tried tier by tier (drawer, modal dialog, plain dialog) and
/// only ones carrying earnings vocabulary count. Within the winning tier the
/// last match is taken: the dashboard leaves closed drawers in the DOM, and
/// the freshest one is appended last.
pub fn locate(doc: &Html) -> Option<ElementRef<'_>> {
    for selector in [&*PANEL_DRAWER, &*PANEL_MODAL, &*PANEL_DIALOG] {
        let hit = doc
            .select(selector)
            .filter(|el| PANEL_VOCAB.is_match(&collect_text(*el)))
            .last();
        if hit.is_some() {
            return hit;
        }
    }
    None
}

/// What it takes to make a collapsed section's rows visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandPlan {
    /// Section toggle reports expanded already; nothing to do.
    AlreadyExpanded,
    /// Click the section's toggle button; fall back to the label on failure.
    Toggle { toggle: String, label: String },
    /// No toggle in the section header; click the label itself.
    Label { label: String },
    /// Label not present (or not visible) in the panel.
    NotFound,
}

/// Plans how to expand the section labeled by `label` inside the panel.
///
/// The toggle is the first `button[aria-expanded]` under the label's nearest
/// div/section ancestor. Anything other than `aria-expanded="true"` counts
/// as collapsed.
pub fn expand_plan(panel: ElementRef<'_>, label: &Regex) -> ExpandPlan {
    let Some(label_el) = find_label(panel, label) else {
        return ExpandPlan::NotFound;
    };
    let label_path = dom::css_path(label_el);

    if let Some(section) = dom::nearest_ancestor(label_el, &["div", "section"]) {
        let toggle = dom::descendant_elements(section)
            .find(|el| el.value().name() == "button" && el.value().attr("aria-expanded").is_some());
        if let Some(toggle) = toggle {
            if toggle.value().attr("aria-expanded") == Some("true") {
                return ExpandPlan::AlreadyExpanded;
            }
            return ExpandPlan::Toggle {
                toggle: dom::css_path(toggle),
                label: label_path,
            };
        }
    }

    ExpandPlan::Label { label: label_path }
}

/// Reads the amount on the same panel row as `label`.
///
/// The row is the label's nearest div/li/tr ancestor; the value is the last
/// descendant of that row whose text carries the currency token (scripts and
/// styles excluded). Reading strictly inside the row keeps a label from
/// picking up an amount that belongs to its neighbor.
pub fn read_amount(panel: ElementRef<'_>, label: &Regex, currency: &str) -> Field<Decimal> {
    let Some(label_el) = find_label(panel, label) else {
        return Field::Unreadable;
    };
    let Some(row) = dom::nearest_ancestor(label_el, &["div", "li", "tr"]) else {
        return Field::Unreadable;
    };
    let value_el = dom::descendant_elements(row)
        .filter(|el| !matches!(el.value().name(), "script" | "style"))
        .filter(|el| collect_text(*el).contains(currency))
        .last();
    match value_el {
        Some(el) => Field::Value(money::parse(&collect_text(el))),
        None => Field::Unreadable,
    }
}

/// Trips count and distance, scraped from the panel's full text.
/// These two have no stable label rows of their own.
pub fn read_trips_and_distance(panel: ElementRef<'_>) -> (Field<u32>, Field<Decimal>) {
    let text = collect_text(panel);

    let trips = TRIPS_COUNT
        .captures(&text)
        .and_then(|caps| caps[1].parse::<u32>().ok());

    let distance = DISTANCE_KM
        .captures(&text)
        .and_then(|caps| money::parse_plain(&caps[1]));

    (Field::from(trips), Field::from(distance))
}

// First visible element (wrappers included) whose whole collapsed text
// matches the label.
fn find_label<'a>(panel: ElementRef<'a>, label: &Regex) -> Option<ElementRef<'a>> {
    dom::descendant_elements(panel)
        .filter(|el| dom::is_visible(*el))
        .find(|el| label.is_match(&collect_text(*el)))
}
