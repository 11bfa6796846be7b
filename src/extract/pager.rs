// src/extract/pager.rs
//
// Table pagination. `probe` reads everything pagination needs from a
// snapshot; `advance` performs the click and decides whether the table
// actually moved by comparing the first row's text before and after.
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::config::timeouts;
use crate::driver::PageDriver;
use crate::extract::dom;
use crate::utils::error::DriverError;

static BUTTON: Lazy<Selector> =
    Lazy::new(|| Selector::parse("button").expect("valid button selector"));
static FIRST_ROW: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div[role='row'], table tbody tr").expect("valid row selector")
});
static NEXT_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Next").expect("valid next pattern"));

#[derive(Debug, Clone)]
pub struct PagerProbe {
    /// Next control exists, is visible, and is not disabled.
    pub next_enabled: bool,
    /// Structural path to the Next control, when one exists at all.
    pub click_path: Option<String>,
    /// First row's text, the marker used for change detection.
    pub first_row_text: Option<String>,
}

/// Reads pagination state from a snapshot. The Next control is the first
/// button whose text mentions "Next"; `disabled` or `aria-disabled="true"`
/// (or being hidden) marks the last page.
pub fn probe(doc: &Html) -> PagerProbe {
    let first_row_text = doc.select(&FIRST_ROW).next().map(dom::collect_text);

    match doc
        .select(&BUTTON)
        .find(|el| NEXT_TEXT.is_match(&dom::collect_text(*el)))
    {
        Some(btn) => {
            let disabled = btn.value().attr("disabled").is_some()
                || btn.value().attr("aria-disabled") == Some("true");
            PagerProbe {
                next_enabled: dom::is_visible(btn) && !disabled,
                click_path: Some(dom::css_path(btn)),
                first_row_text,
            }
        }
        None => PagerProbe {
            next_enabled: false,
            click_path: None,
            first_row_text,
        },
    }
}

/// Flips to the next page. Returns false when the table cannot or did not
/// move: Next disabled or missing, the click failing, or the first row
/// staying identical after the flip (some builds leave the button enabled
/// on the last page).
pub async fn advance(driver: &dyn PageDriver) -> Result<bool, DriverError> {
    let html = driver.content().await?;
    let before = probe(&Html::parse_document(&html));
    if !before.next_enabled {
        tracing::debug!("Next button is disabled or missing, at last page");
        return Ok(false);
    }
    let Some(path) = before.click_path.as_deref() else {
        return Ok(false);
    };
    if let Err(e) = driver.click(path).await {
        tracing::debug!("Next click failed: {}", e);
        return Ok(false);
    }

    driver.wait_network_idle(timeouts::NETWORK_IDLE).await;
    driver.settle(timeouts::PAGE_SETTLE).await;

    let html = driver.content().await?;
    let after = probe(&Html::parse_document(&html));
    let before_text = before.first_row_text.unwrap_or_default();
    let after_text = after.first_row_text.unwrap_or_default();
    Ok(!after_text.is_empty() && after_text != before_text)
}
