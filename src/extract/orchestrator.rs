// src/extract/orchestrator.rs
//
// The full extraction walk: widen the table, resolve the selected week,
// find the driver rows, then for each row open its details panel, read it,
// and close it again, page by page until the pager stops moving.
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::config::{timeouts, Config};
use crate::driver::PageDriver;
use crate::extract::{dates, dom, pager, record};
use crate::supplier::models::{DateRange, DriverRecord};
use crate::utils::error::ExtractError;
use crate::utils::snapshot;

static GRID_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[role='row']").expect("valid grid row selector"));
static TESTID_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-testid*='driver']").expect("valid testid selector"));
static TABLE_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table tbody tr").expect("valid table row selector"));
static ANY_TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid tr selector"));

static ROWS_CONTROL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("button, div").expect("valid control selector"));
static ROWS_OPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[role='listbox'] button, [role='menu'] button, .dropdown-item")
        .expect("valid option selector")
});

static ROWS_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+\s*rows?").expect("valid rows pattern"));
static NUMERIC_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid digits pattern"));
// Case matters: header cells say "Driver name" / "Total earnings" verbatim,
// while a driver named "Driver Name Test" must stay a data row.
static HEADER_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Driver name|Total earnings").expect("valid header pattern"));
static TRIGGER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)expand|details|more").expect("valid trigger pattern"));

/// What one full extraction produced.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub records: Vec<DriverRecord>,
    pub pages_processed: u32,
    pub range: Option<DateRange>,
}

// --- Row Location ---

/// How driver rows are found on this particular rendering of the table.
/// Probed once on the first page; the winner is reused for every page so a
/// layout that matched page one cannot silently change meaning on page two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLocator {
    Grid,
    TestId,
    TableRow,
    RowWithImage,
}

impl RowLocator {
    fn rows<'a>(self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            RowLocator::Grid => doc.select(&GRID_ROW).collect(),
            RowLocator::TestId => doc.select(&TESTID_ROW).collect(),
            RowLocator::TableRow => doc.select(&TABLE_ROW).collect(),
            RowLocator::RowWithImage => doc
                .select(&ANY_TR)
                .filter(|tr| dom::has_descendant_tag(*tr, "img"))
                .collect(),
        }
    }
}

// A locator must match more than one element to count: one match is just a
// header (or a lone container), and a table without data rows is no table.
fn probe_rows(doc: &Html) -> Option<RowLocator> {
    [
        RowLocator::Grid,
        RowLocator::TestId,
        RowLocator::TableRow,
        RowLocator::RowWithImage,
    ]
    .into_iter()
    .find(|loc| loc.rows(doc).len() > 1)
}

// --- Per-Row Planning ---

// Everything the loop needs from one data row, captured from a snapshot
// before any panel is opened.
struct RowPlan {
    name: Option<String>,
    trigger: Option<String>,
    row_path: String,
}

fn plan_rows(doc: &Html, locator: RowLocator, currency: &str) -> Vec<RowPlan> {
    locator
        .rows(doc)
        .into_iter()
        .filter(|row| !HEADER_ROW.is_match(&dom::collect_text(*row)))
        .map(|row| RowPlan {
            name: derive_name(row, currency),
            trigger: find_trigger(row),
            row_path: dom::css_path(row),
        })
        .collect()
}

// First div/span/td in the row whose text starts with a letter and is not an
// amount. Falls back to None; the caller numbers anonymous drivers.
fn derive_name(row: ElementRef<'_>, currency: &str) -> Option<String> {
    dom::descendant_elements(row)
        .filter(|el| matches!(el.value().name(), "div" | "span" | "td"))
        .map(dom::collect_text)
        .find(|t| {
            t.chars()
                .next()
                .map(|c| c.is_ascii_alphabetic())
                .unwrap_or(false)
                && !t.starts_with(currency)
        })
}

// The control that opens a row's details panel varies per layout. Strategies
// run most-specific first; each takes the last visible match in the row
// (the details chevron sits at the row's trailing edge).
fn find_trigger(row: ElementRef<'_>) -> Option<String> {
    let strategies: [fn(ElementRef<'_>) -> bool; 5] = [
        |el| el.value().name() == "button" && dom::is_last_element_child(el),
        |el| {
            el.value().name() == "button"
                && dom::is_last_element_child(el)
                && dom::has_descendant_tag(el, "svg")
        },
        |el| el.value().name() == "button" && has_trigger_label(el),
        |el| el.value().name() == "button" && dom::has_descendant_tag(el, "svg"),
        |el| el.value().attr("role") == Some("button") && dom::has_descendant_tag(el, "svg"),
    ];

    for matches in strategies {
        let hit = dom::descendant_elements(row)
            .filter(|el| matches(*el))
            .filter(|el| dom::is_visible(*el))
            .last();
        if let Some(el) = hit {
            return Some(dom::css_path(el));
        }
    }
    None
}

fn has_trigger_label(el: ElementRef<'_>) -> bool {
    el.value()
        .attr("aria-label")
        .map(|label| TRIGGER_LABEL.is_match(label))
        .unwrap_or(false)
}

// --- Rows Per Page ---

/// Bumps the table to its largest rows-per-page setting so pagination is
/// mostly unnecessary. Best effort: a missing control, a lost snapshot or
/// a click that goes nowhere leaves the default page size in place.
pub async fn maximize_rows_per_page(driver: &dyn PageDriver) -> bool {
    let html = match driver.content().await {
        Ok(html) => html,
        Err(e) => {
            debug!("Could not snapshot the page for the rows control: {}", e);
            return false;
        }
    };
    let control = {
        let doc = Html::parse_document(&html);
        find_rows_control(&doc)
    };
    let Some(control) = control else {
        debug!("No rows-per-page control on this view");
        return false;
    };
    if let Err(e) = driver.click(&control).await {
        debug!("Rows-per-page control click failed: {}", e);
        return false;
    }
    driver.settle(timeouts::ROWS_MENU_SETTLE).await;

    let html = match driver.content().await {
        Ok(html) => html,
        Err(e) => {
            debug!("Could not snapshot the open rows menu: {}", e);
            return false;
        }
    };
    let option = {
        let doc = Html::parse_document(&html);
        find_last_numeric_option(&doc)
    };
    match option {
        Some(path) => {
            if let Err(e) = driver.click(&path).await {
                debug!("Rows-per-page option click failed: {}", e);
                return false;
            }
            driver.settle(timeouts::ROWS_PICK_SETTLE).await;
            info!("Rows-per-page set to the largest option");
            true
        }
        None => {
            debug!("Rows-per-page menu opened but offered no numeric option");
            if let Err(e) = driver.press_escape().await {
                debug!("Could not close the rows menu: {}", e);
            }
            driver.settle(timeouts::PANEL_CLOSE_SETTLE).await;
            false
        }
    }
}

// The visible "N rows" chip, innermost match: the chip sits inside layers of
// wrapper divs whose text all contains "N rows", and clicking a wrapper
// misses the control.
fn find_rows_control(doc: &Html) -> Option<String> {
    let matches_control = |el: ElementRef<'_>| {
        matches!(el.value().name(), "button" | "div")
            && dom::is_visible(el)
            && ROWS_TEXT.is_match(&dom::collect_text(el))
    };
    doc.select(&ROWS_CONTROL)
        .filter(|el| matches_control(*el))
        .find(|el| !dom::descendant_elements(*el).any(matches_control))
        .map(dom::css_path)
}

// Menu options are plain numbers; the largest page size is listed last.
fn find_last_numeric_option(doc: &Html) -> Option<String> {
    doc.select(&ROWS_OPTION)
        .filter(|el| dom::is_visible(*el))
        .filter(|el| NUMERIC_ONLY.is_match(&dom::collect_text(*el)))
        .last()
        .map(dom::css_path)
}

// --- The Walk ---

/// Runs the whole extraction against the earnings page the driver is
/// currently on. Fails only when no table can be found at all or nothing
/// could be read; individual unreadable panels degrade to zeroed records.
pub async fn run(driver: &dyn PageDriver, cfg: &Config) -> Result<ExtractionOutcome, ExtractError> {
    maximize_rows_per_page(driver).await;
    driver.settle(timeouts::ROW_REFRESH_SETTLE).await;

    let html = driver.content().await?;
    let (locator, range) = {
        let doc = Html::parse_document(&html);
        let range = dates::find_display_text(&doc).and_then(|t| dates::parse(&t));
        (probe_rows(&doc), range)
    };
    let Some(locator) = locator else {
        if let Some(path) = snapshot::dump_page(cfg.snapshot_dir.as_deref(), "no-driver-rows", &html)
        {
            info!("Saved page snapshot to {}", path.display());
        }
        return Err(ExtractError::NoDriverRows);
    };
    info!("Row locator: {:?}", locator);
    match &range {
        Some(r) => info!("Selected range: {}", r.label()),
        None => warn!("Could not resolve the selected date range from the page"),
    }
    let (start, end) = match &range {
        Some(r) => (r.start, r.end),
        None => {
            let today = chrono::Local::now().date_naive();
            (today, today)
        }
    };

    let mut records: Vec<DriverRecord> = Vec::new();
    let mut page_number: u32 = 1;
    loop {
        let html = driver.content().await?;
        let plans = {
            let doc = Html::parse_document(&html);
            plan_rows(&doc, locator, &cfg.currency)
        };
        info!("Page {}: {} data rows", page_number, plans.len());

        for plan in plans {
            let name = plan
                .name
                .unwrap_or_else(|| format!("Driver {}", records.len() + 1));

            let opened = match plan.trigger.as_deref() {
                Some(path) => driver.click(path).await.is_ok(),
                None => false,
            };
            if !opened {
                if let Err(e) = driver.click(&plan.row_path).await {
                    warn!("Could not open details for {:?}: {}", name, e);
                    records.push(DriverRecord::zeroed(&name, start, end));
                    continue;
                }
            }

            let rec = match record::capture(driver, &name, &cfg.currency, start, end).await {
                Ok(rec) => {
                    debug!(
                        "Extracted {:?}: payout {} over {} trips",
                        rec.name, rec.payout, rec.trips
                    );
                    rec
                }
                Err(e) => {
                    warn!("Browser hiccup while reading {:?}, row zeroed: {}", name, e);
                    DriverRecord::zeroed(&name, start, end)
                }
            };
            records.push(rec);

            if let Err(e) = driver.press_escape().await {
                debug!("Panel close keystroke failed: {}", e);
            }
            driver.settle(timeouts::PANEL_CLOSE_SETTLE).await;
        }

        if page_number >= cfg.max_pages {
            if pages_remain(driver).await {
                warn!("Stopping at the {}-page cap", cfg.max_pages);
            }
            break;
        }
        if !pager::advance(driver).await? {
            break;
        }
        page_number += 1;
    }

    if records.is_empty() {
        let html = driver.content().await?;
        if let Some(path) = snapshot::dump_page(cfg.snapshot_dir.as_deref(), "no-records", &html) {
            info!("Saved page snapshot to {}", path.display());
        }
        return Err(ExtractError::NoRecords);
    }
    info!(
        "Extraction complete: {} records over {} page(s)",
        records.len(),
        page_number
    );
    Ok(ExtractionOutcome {
        records,
        pages_processed: page_number,
        range,
    })
}

// Whether the pager still offers a live Next control, so hitting the page
// cap on the roster's natural last page is not reported as a truncation.
async fn pages_remain(driver: &dyn PageDriver) -> bool {
    match driver.content().await {
        Ok(html) => pager::probe(&Html::parse_document(&html)).next_enabled,
        // Unreadable page: assume truncation so the warning still fires.
        Err(_) => true,
    }
}
