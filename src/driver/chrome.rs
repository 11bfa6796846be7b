// src/driver/chrome.rs
//
// Everything that touches headless_chrome lives here: launching browsers,
// the PageDriver implementation, and the small tab helpers the session and
// command layers use directly. The CDP client is synchronous, so each call
// hops onto the blocking pool.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network::{Cookie, CookieParam};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::config::timeouts;
use crate::driver::PageDriver;
use crate::supplier::SessionState;
use crate::utils::error::DriverError;

/// Launches the visible browser used for login and manual range setup.
pub fn launch_interactive() -> Result<(Browser, Arc<Tab>), DriverError> {
    launch(false)
}

/// Launches the hidden browser used for session checks and PDF printing.
pub fn launch_headless() -> Result<(Browser, Arc<Tab>), DriverError> {
    launch(true)
}

fn launch(headless: bool) -> Result<(Browser, Arc<Tab>), DriverError> {
    let options = LaunchOptions::default_builder()
        .headless(headless)
        .window_size(Some((1360, 900)))
        .idle_browser_timeout(timeouts::IDLE_BROWSER)
        .build()
        .map_err(|e| DriverError::Launch(e.to_string()))?;

    let browser = Browser::new(options).map_err(|e| DriverError::Launch(e.to_string()))?;
    let tab = browser
        .new_tab()
        .map_err(|e| DriverError::Launch(e.to_string()))?;
    tracing::debug!("Launched {} browser", if headless { "headless" } else { "visible" });
    Ok((browser, tab))
}

/// `PageDriver` over one live tab.
pub struct ChromeDriver {
    tab: Arc<Tab>,
}

impl ChromeDriver {
    pub fn new(tab: Arc<Tab>) -> Self {
        ChromeDriver { tab }
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn content(&self) -> Result<String, DriverError> {
        content(&self.tab).await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.tab.get_url())
    }

    async fn click(&self, css: &str) -> Result<(), DriverError> {
        click_first(&self.tab, css).await
    }

    async fn press_escape(&self) -> Result<(), DriverError> {
        press_key(&self.tab, "Escape").await
    }

    async fn settle(&self, wait: Duration) {
        tokio::time::sleep(wait).await;
    }

    // The CDP client does not surface a network-idle event, so treat two
    // identical DOM sightings in a row as quiet.
    async fn wait_network_idle(&self, budget: Duration) {
        let deadline = tokio::time::Instant::now() + budget;
        let mut last_len = match content(&self.tab).await {
            Ok(html) => html.len(),
            Err(_) => return,
        };
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(250)).await;
            match content(&self.tab).await {
                Ok(html) if html.len() == last_len => return,
                Ok(html) => last_len = html.len(),
                Err(_) => return,
            }
        }
        tracing::debug!("Page kept changing for the whole idle budget");
    }
}

// --- Tab helpers (shared with session and command layers) ---

async fn run_blocking<T, F>(f: F) -> Result<T, DriverError>
where
    F: FnOnce() -> Result<T, DriverError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DriverError::Task(e.to_string()))?
}

pub async fn content(tab: &Arc<Tab>) -> Result<String, DriverError> {
    let tab = tab.clone();
    run_blocking(move || {
        tab.get_content()
            .map_err(|e| DriverError::Protocol(e.to_string()))
    })
    .await
}

pub async fn click_first(tab: &Arc<Tab>, css: &str) -> Result<(), DriverError> {
    let tab = tab.clone();
    let css = css.to_string();
    run_blocking(move || {
        let elements = tab
            .find_elements(&css)
            .map_err(|e| DriverError::NotFound(format!("{} ({})", css, e)))?;
        let element = elements
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(css.clone()))?;
        element
            .click()
            .map_err(|e| DriverError::Protocol(e.to_string()))?;
        Ok(())
    })
    .await
}

pub async fn press_key(tab: &Arc<Tab>, key: &'static str) -> Result<(), DriverError> {
    let tab = tab.clone();
    run_blocking(move || {
        tab.press_key(key)
            .map(|_| ())
            .map_err(|e| DriverError::Protocol(e.to_string()))
    })
    .await
}

/// Navigates and waits for the load to finish, bounded by `timeout`.
pub async fn navigate(tab: &Arc<Tab>, url: &str, timeout: Duration) -> Result<(), DriverError> {
    let tab = tab.clone();
    let url = url.to_string();
    run_blocking(move || {
        tab.set_default_timeout(timeout);
        tab.navigate_to(&url)
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        Ok(())
    })
    .await
}

/// Brings the tab's window to the foreground.
pub async fn activate(tab: &Arc<Tab>) -> Result<(), DriverError> {
    let tab = tab.clone();
    run_blocking(move || {
        tab.activate()
            .map(|_| ())
            .map_err(|e| DriverError::Protocol(e.to_string()))
    })
    .await
}

/// Polls the rendered page text for any of `needles` until `budget` runs out.
pub async fn wait_for_text(tab: &Arc<Tab>, needles: &[&str], budget: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + budget;
    loop {
        if let Ok(html) = content(tab).await {
            let doc = scraper::Html::parse_document(&html);
            let text = crate::extract::dom::collect_text(doc.root_element());
            if needles.iter().any(|n| text.contains(n)) {
                return true;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

pub async fn get_cookies(tab: &Arc<Tab>) -> Result<Vec<Cookie>, DriverError> {
    let tab = tab.clone();
    run_blocking(move || {
        tab.get_cookies()
            .map_err(|e| DriverError::Protocol(e.to_string()))
    })
    .await
}

pub async fn set_cookies(tab: &Arc<Tab>, cookies: Vec<CookieParam>) -> Result<(), DriverError> {
    let tab = tab.clone();
    run_blocking(move || {
        tab.set_cookies(cookies)
            .map_err(|e| DriverError::Protocol(e.to_string()))
    })
    .await
}

pub async fn print_pdf(
    tab: &Arc<Tab>,
    options: PrintToPdfOptions,
) -> Result<Vec<u8>, DriverError> {
    let tab = tab.clone();
    run_blocking(move || {
        tab.print_to_pdf(Some(options))
            .map_err(|e| DriverError::Protocol(e.to_string()))
    })
    .await
}

// --- Cookie round-trips ---
//
// The protocol's Cookie and CookieParam are kept as opaque JSON inside
// SessionState, so unknown protocol fields pass through untouched and a
// vault written by one browser version restores in another.

pub fn cookies_to_state(cookies: &[Cookie]) -> SessionState {
    let values = cookies
        .iter()
        .filter_map(|c| match serde_json::to_value(c) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Dropping cookie that does not serialize: {}", e);
                None
            }
        })
        .collect();
    SessionState::new(values)
}

pub fn state_to_cookie_params(state: &SessionState) -> Vec<CookieParam> {
    state
        .cookies
        .iter()
        .filter_map(|v| match serde_json::from_value::<CookieParam>(v.clone()) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("Skipping stored cookie that does not convert: {}", e);
                None
            }
        })
        .collect()
}
