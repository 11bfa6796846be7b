// src/extract/dates.rs
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::extract::dom;
use crate::supplier::DateRange;

// --- Compiled Patterns ---

// "Sep 1st, 2025 04:01 AM - Sep 4th, 2025 06:36 PM" (times optional).
// The chip always uses ordinals in this form.
static RICH_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"([A-Za-z]{3}\s+\d{1,2}(?:st|nd|rd|th),\s+\d{4})(?:\s+\d{2}:\d{2}\s+(?:AM|PM))?\s*-\s*([A-Za-z]{3}\s+\d{1,2}(?:st|nd|rd|th),\s+\d{4})(?:\s+\d{2}:\d{2}\s+(?:AM|PM))?",
    )
    .expect("valid rich range pattern")
});

// "September 1, 2025 - September 4, 2025" without ordinals or times.
static SIMPLE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z]{3,9}\s+\d{1,2},\s+\d{4})\s*-\s*([A-Za-z]{3,9}\s+\d{1,2},\s+\d{4})")
        .expect("valid simple range pattern")
});

// Free-text variant demanding a time of day on both sides; bare dates appear
// all over the page, so a loose match would latch onto the wrong text.
static PAGE_TEXT_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"([A-Za-z]{3}\s+\d{1,2}(?:st|nd|rd|th),\s+\d{4}\s+\d{2}:\d{2}\s+(?:AM|PM))\s*-\s*([A-Za-z]{3}\s+\d{1,2}(?:st|nd|rd|th),\s+\d{4}\s+\d{2}:\d{2}\s+(?:AM|PM))",
    )
    .expect("valid page text range pattern")
});

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})(?:st|nd|rd|th)").expect("valid ordinal pattern"));

// Matches the chip text itself when hunting for the element that carries it.
static CHIP_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]{3}\s+\d{1,2}(?:st|nd|rd|th),\s+\d{4}.*\d{2}:\d{2}\s+(?:AM|PM)")
        .expect("valid chip text pattern")
});

static SIMPLE_CHIP_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]{3,9}\s+\d{1,2},\s+\d{4}").expect("valid simple chip pattern")
});

static BUTTONS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("button, div[role='button']").expect("valid button selector"));

/// Parses a date-range chip text into a `DateRange`.
///
/// Dashes are normalized first (the chip uses an en dash), then the rich
/// ordinal form is tried, then the plain "Month D, YYYY" form. The raw text
/// survives verbatim in `display_text`. Returns `None` when either anchor
/// fails to parse; the caller degrades to today's date.
pub fn parse(raw: &str) -> Option<DateRange> {
    let clean = normalize_dashes(raw);

    let (start_txt, end_txt) = if let Some(caps) = RICH_RANGE.captures(&clean) {
        (caps[1].to_string(), caps[2].to_string())
    } else if let Some(caps) = SIMPLE_RANGE.captures(&clean) {
        (caps[1].to_string(), caps[2].to_string())
    } else {
        tracing::debug!("Date range text did not match any known format: {:?}", raw);
        return None;
    };

    let start = parse_anchor(&start_txt)?;
    let end = parse_anchor(&end_txt)?;

    Some(DateRange {
        start,
        end,
        display_text: raw.trim().to_string(),
    })
}

/// Finds the date-range chip text in a page snapshot.
///
/// Looks for a visible button (or button-role div) whose text carries the
/// rich date format, then the plain format, and as a last resort scans the
/// whole page text for a rich range with times on both sides.
pub fn find_display_text(doc: &Html) -> Option<String> {
    let chip = chip_candidates(doc, &CHIP_TEXT).or_else(|| chip_candidates(doc, &SIMPLE_CHIP_TEXT));
    if let Some(el) = chip {
        let text = dom::collect_text(el);
        tracing::debug!("Found date chip: {:?}", text);
        return Some(text);
    }

    let page_text = dom::collect_text(doc.root_element());
    let clean = normalize_dashes(&page_text);
    if let Some(caps) = PAGE_TEXT_RANGE.captures(&clean) {
        let text = format!("{} - {}", &caps[1], &caps[2]);
        tracing::debug!("Found date range in page text: {:?}", text);
        return Some(text);
    }

    tracing::debug!("No date range found on page");
    None
}

fn chip_candidates<'a>(doc: &'a Html, pattern: &Regex) -> Option<ElementRef<'a>> {
    doc.select(&BUTTONS)
        .filter(|el| dom::is_visible(*el))
        .find(|el| pattern.is_match(&normalize_dashes(&dom::collect_text(*el))))
}

fn normalize_dashes(text: &str) -> String {
    text.replace(['\u{2013}', '\u{2014}'], "-")
}

// "Sep 1st, 2025" -> 2025-09-01. Ordinal suffix is dropped, then both the
// abbreviated and full month forms are tried.
fn parse_anchor(text: &str) -> Option<NaiveDate> {
    let plain = ORDINAL.replace(text, "$1");
    let plain = plain.trim();
    NaiveDate::parse_from_str(plain, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(plain, "%B %d, %Y"))
        .ok()
}
