// src/extract/record.rs
//
// Turns one open details panel into a DriverRecord. The orchestrator opens
// the panel (and closes it afterwards); this module waits for it to appear,
// expands the earnings breakdown, and reads every line, substituting zeros
// for whatever the panel refuses to show.
use chrono::NaiveDate;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::config::timeouts;
use crate::driver::PageDriver;
use crate::extract::panel::{self, ExpandPlan};
use crate::supplier::models::{DriverRecord, PanelAmounts};
use crate::utils::error::DriverError;

/// Polls page content until a details panel shows up or the attempt budget
/// runs out. Budget is expressed in polls rather than wall-clock time, so a
/// panel that renders instantly is detected on the first pass.
pub async fn wait_for_panel(driver: &dyn PageDriver) -> Result<bool, DriverError> {
    let attempts =
        (timeouts::PANEL_VISIBLE.as_millis() / timeouts::PANEL_POLL.as_millis()).max(1);
    for _ in 0..attempts {
        let html = driver.content().await?;
        if panel::locate(&Html::parse_document(&html)).is_some() {
            return Ok(true);
        }
        driver.settle(timeouts::PANEL_POLL).await;
    }
    Ok(false)
}

/// Reads the panel currently open for `name`. A panel that never appears or
/// vanishes mid-read produces a zeroed record instead of failing the run;
/// the gap stays visible in the report and the log says why.
pub async fn capture(
    driver: &dyn PageDriver,
    name: &str,
    currency: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<DriverRecord, DriverError> {
    if !wait_for_panel(driver).await? {
        warn!("Details panel for {:?} did not appear, recording zeros", name);
        return Ok(DriverRecord::zeroed(name, start, end));
    }

    expand_breakdown(driver).await?;

    let html = driver.content().await?;
    let doc = Html::parse_document(&html);
    let Some(panel_el) = panel::locate(&doc) else {
        warn!("Details panel for {:?} vanished before reading, recording zeros", name);
        return Ok(DriverRecord::zeroed(name, start, end));
    };
    Ok(DriverRecord::from_amounts(
        name,
        read_amounts(panel_el, currency),
        start,
        end,
    ))
}

// Expands the "Total earnings" section so the fare/fee/tip lines are in the
// DOM. Click failures are tolerated: a panel that will not expand still has
// its headline figures readable.
async fn expand_breakdown(driver: &dyn PageDriver) -> Result<(), DriverError> {
    let html = driver.content().await?;
    let plan = {
        let doc = Html::parse_document(&html);
        match panel::locate(&doc) {
            Some(p) => panel::expand_plan(p, &panel::TOTAL_EARNINGS),
            None => ExpandPlan::NotFound,
        }
    };

    match plan {
        ExpandPlan::AlreadyExpanded => {}
        ExpandPlan::Toggle { toggle, label } => {
            if let Err(e) = driver.click(&toggle).await {
                debug!("Breakdown toggle click failed ({}), trying the label", e);
                if let Err(e) = driver.click(&label).await {
                    debug!("Label click failed as well: {}", e);
                }
            }
            driver.settle(timeouts::EXPAND_SETTLE).await;
        }
        ExpandPlan::Label { label } => {
            if let Err(e) = driver.click(&label).await {
                debug!("Label click failed: {}", e);
            }
            driver.settle(timeouts::LABEL_SETTLE).await;
        }
        ExpandPlan::NotFound => {
            debug!("No expandable earnings section in panel");
        }
    }
    Ok(())
}

fn read_amounts(panel_el: ElementRef<'_>, currency: &str) -> PanelAmounts {
    let (trips, distance) = panel::read_trips_and_distance(panel_el);
    PanelAmounts {
        total_earnings: panel::read_amount(panel_el, &panel::TOTAL_EARNINGS, currency)
            .or_zero("total earnings"),
        fare: panel::read_amount(panel_el, &panel::FARE, currency).or_zero("fare"),
        service_fee: panel::read_amount(panel_el, &panel::SERVICE_FEE, currency)
            .or_zero("service fee"),
        other_earnings: panel::read_amount(panel_el, &panel::OTHER_EARNINGS, currency)
            .or_zero("other earnings"),
        taxes: panel::read_amount(panel_el, &panel::TAXES, currency).or_zero("taxes"),
        tips: panel::read_amount(panel_el, &panel::TIPS, currency).or_zero("tips"),
        refunds_expenses: panel::read_amount(panel_el, &panel::REFUNDS_EXPENSES, currency)
            .or_zero("refunds & expenses"),
        adjustments: panel::read_amount(panel_el, &panel::ADJUSTMENTS, currency)
            .or_zero("adjustments"),
        payout: panel::read_amount(panel_el, &panel::PAYOUT, currency).or_zero("payout"),
        trips: trips.or_zero("trips"),
        distance_km: distance.or_zero("distance"),
    }
}
