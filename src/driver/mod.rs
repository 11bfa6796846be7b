// src/driver/mod.rs
pub mod chrome;

use std::time::Duration;

use async_trait::async_trait;

use crate::utils::error::DriverError;

/// The handful of page effects extraction needs from a live browser.
///
/// Analysis happens on HTML snapshots; actions are addressed by structural
/// css paths computed from those snapshots. Keeping the surface this small
/// lets tests drive the whole extraction loop with a scripted fake instead
/// of a real browser.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Full HTML of the current page.
    async fn content(&self) -> Result<String, DriverError>;

    /// URL the page is currently on.
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Clicks the first element matching `css`. Paths produced by
    /// `dom::css_path` match exactly one element.
    async fn click(&self, css: &str) -> Result<(), DriverError>;

    /// Sends Escape to the page; the dashboard closes its drawer on it.
    async fn press_escape(&self) -> Result<(), DriverError>;

    /// Gives the page time to settle after an action.
    async fn settle(&self, wait: Duration);

    /// Waits for the page to stop changing, bounded by `budget`.
    async fn wait_network_idle(&self, budget: Duration);
}
