// src/commands/mod.rs
//
// The operations the CLI exposes, one function per user-facing action.
// Each returns a serializable outcome rather than an error: a failed
// command is a result to show the user, not a crash, and the caller
// decides between human text and JSON.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use headless_chrome::Tab;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{timeouts, Config};
use crate::driver::chrome::{self, ChromeDriver};
use crate::extract::orchestrator;
use crate::report::{pdf, workbook, ReportDocument};
use crate::session::{manager, SessionManager, SessionVault};
use crate::supplier::client::{self, SessionProbe};
use crate::supplier::SessionState;
use crate::utils::error::{AppError, DriverError, VaultError};

const EXPIRED_MSG: &str = "Session expired. Please connect again.";

/// `persist_session` failure that only means the user has not finished the
/// sign-in flow yet; callers may retry after the user acts.
pub const NOT_SIGNED_IN_MSG: &str =
    "Please finish sign-in to the Supplier dashboard, then try again.";

// --- Outcome types ---

/// Result of a simple action (open login, save session, reveal, export).
#[derive(Debug, Serialize)]
pub struct ActionOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionOutcome {
    fn ok() -> Self {
        ActionOutcome {
            ok: true,
            file: None,
            message: None,
        }
    }

    fn ok_with(message: &str) -> Self {
        ActionOutcome {
            ok: true,
            file: None,
            message: Some(message.to_string()),
        }
    }

    fn with_file(file: PathBuf) -> Self {
        ActionOutcome {
            ok: true,
            file: Some(file),
            message: None,
        }
    }

    fn fail(message: &str) -> Self {
        ActionOutcome {
            ok: false,
            file: None,
            message: Some(message.to_string()),
        }
    }
}

/// Why a session check came back negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckReason {
    Expired,
    NoSession,
}

/// Result of the session checks and of manual range setup.
#[derive(Debug, Serialize)]
pub struct CheckOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CheckReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckOutcome {
    fn ok() -> Self {
        CheckOutcome {
            ok: true,
            reason: None,
            message: None,
        }
    }

    fn ok_with(message: &str) -> Self {
        CheckOutcome {
            ok: true,
            reason: None,
            message: Some(message.to_string()),
        }
    }

    fn expired() -> Self {
        CheckOutcome {
            ok: false,
            reason: Some(CheckReason::Expired),
            message: Some(EXPIRED_MSG.to_string()),
        }
    }

    fn no_session(message: &str) -> Self {
        CheckOutcome {
            ok: false,
            reason: Some(CheckReason::NoSession),
            message: Some(message.to_string()),
        }
    }

    fn fail(message: &str) -> Self {
        CheckOutcome {
            ok: false,
            reason: None,
            message: Some(message.to_string()),
        }
    }
}

/// Result of a full extraction run.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunOutcome {
    fn done(file: PathBuf, records: usize, pages: u32) -> Self {
        RunOutcome {
            ok: true,
            file: Some(file),
            records_processed: Some(records),
            pages_processed: Some(pages),
            message: None,
        }
    }

    fn fail(message: &str) -> Self {
        RunOutcome {
            ok: false,
            file: None,
            records_processed: None,
            pages_processed: None,
            message: Some(message.to_string()),
        }
    }
}

// --- Session commands ---

/// Whether an encrypted session file exists on disk. Says nothing about
/// whether the dashboard still honors it.
pub fn has_session(cfg: &Config) -> bool {
    SessionVault::open(cfg).exists()
}

/// Opens (or raises) the visible browser window on the supplier dashboard
/// so the user can sign in. An already-open window is left exactly where
/// the user last had it.
pub async fn open_login_surface(cfg: &Config, manager: &SessionManager) -> ActionOutcome {
    if let Some(tab) = manager.interactive_tab().await {
        if chrome::activate(&tab).await.is_ok() {
            debug!("Raising the window that is already open");
            return ActionOutcome::ok_with(
                "Sign in to the Supplier dashboard, then save the session.",
            );
        }
    }
    match open_login_inner(cfg, manager).await {
        Ok(()) => {
            ActionOutcome::ok_with("Sign in to the Supplier dashboard, then save the session.")
        }
        Err(e) => {
            error!("Could not open the login window: {}", e);
            manager.close_interactive().await;
            ActionOutcome::fail("Failed to open the login window.")
        }
    }
}

async fn open_login_inner(cfg: &Config, manager: &SessionManager) -> Result<(), DriverError> {
    let tab = manager.open_interactive().await?;
    chrome::navigate(&tab, &cfg.vehicles_url(), timeouts::NAV_FULL).await
}

/// Captures the signed-in browser's cookies and seals them into the vault.
/// The login window is closed once the cookies are read, whether or not
/// sealing succeeds.
pub async fn persist_session(cfg: &Config, manager: &SessionManager) -> ActionOutcome {
    let Some(tab) = manager.interactive_tab().await else {
        return ActionOutcome::fail("Login window not open.");
    };
    // Off the supplier domain, give a mid-redirect login a moment to land.
    if !client::on_supplier_domain(&tab.get_url())
        && !chrome::wait_for_text(&tab, &client::EARNINGS_VOCAB, timeouts::LOGIN_VALIDATE).await
    {
        return ActionOutcome::fail(NOT_SIGNED_IN_MSG);
    }

    let sealed = seal_cookies(cfg, &tab).await;
    manager.close_interactive().await;
    match sealed {
        Ok(path) => ActionOutcome::with_file(path),
        Err(e) => {
            error!("Could not capture the session: {}", e);
            ActionOutcome::fail("Failed to save session. See console for details.")
        }
    }
}

async fn seal_cookies(cfg: &Config, tab: &Arc<Tab>) -> Result<PathBuf, AppError> {
    let cookies = chrome::get_cookies(tab).await?;
    let state = chrome::cookies_to_state(&cookies);
    let path = SessionVault::open(cfg).save(&state)?;
    Ok(path)
}

/// Checks whether the stored session still works: a cheap HTTP probe of
/// the earnings page first, confirmed by a render check in the hidden
/// browser. If the browser cannot run, a positive probe stands alone.
pub async fn quick_session_check(cfg: &Config, manager: &SessionManager) -> CheckOutcome {
    let state = match SessionVault::open(cfg).load() {
        Ok(state) => state,
        Err(VaultError::NotFound) => {
            return CheckOutcome::no_session(
                "No saved session. Click Connect Uber, then Save Session.",
            );
        }
        Err(e) => {
            warn!("Session vault unreadable: {}", e);
            return CheckOutcome::fail(&e.to_string());
        }
    };

    let probe_confirmed = match client::probe_session(&state, cfg).await {
        Ok(SessionProbe::Expired) => return CheckOutcome::expired(),
        Ok(SessionProbe::Active) => true,
        Err(e) => {
            warn!("HTTP probe unavailable, relying on the browser check: {}", e);
            false
        }
    };

    match render_check(cfg, manager, &state).await {
        Ok(RenderCheck::Confirmed) => CheckOutcome::ok(),
        Ok(RenderCheck::AuthRedirect) => CheckOutcome::expired(),
        Ok(RenderCheck::NoVocab) => {
            CheckOutcome::fail("Dashboard did not render earnings content. Please try again.")
        }
        Err(e) if probe_confirmed => {
            warn!("Browser check unavailable ({}), trusting the HTTP probe", e);
            CheckOutcome::ok()
        }
        Err(e) => {
            warn!("Session check failed on both paths: {}", e);
            CheckOutcome::fail("Could not reach the dashboard to verify the session.")
        }
    }
}

enum RenderCheck {
    Confirmed,
    AuthRedirect,
    NoVocab,
}

async fn render_check(
    cfg: &Config,
    manager: &SessionManager,
    state: &SessionState,
) -> Result<RenderCheck, DriverError> {
    let tab = manager.warm_tab().await?;
    chrome::set_cookies(&tab, chrome::state_to_cookie_params(state)).await?;
    chrome::navigate(&tab, &cfg.earnings_url(), timeouts::NAV_PROBE).await?;
    if client::is_auth_url(&tab.get_url()) {
        return Ok(RenderCheck::AuthRedirect);
    }
    if chrome::wait_for_text(&tab, &client::EARNINGS_VOCAB, timeouts::VOCAB_WAIT).await {
        Ok(RenderCheck::Confirmed)
    } else if client::is_auth_url(&tab.get_url()) {
        // Late redirect while we were waiting for the page to fill in.
        Ok(RenderCheck::AuthRedirect)
    } else {
        Ok(RenderCheck::NoVocab)
    }
}

/// Opens a visible browser with the restored session on the earnings page
/// and leaves it there for the user to pick the week. The window stays
/// open and is what `run_extraction` later takes over.
pub async fn begin_manual_range_setup(cfg: &Config, manager: &SessionManager) -> CheckOutcome {
    let state = match SessionVault::open(cfg).load() {
        Ok(state) => state,
        Err(VaultError::NotFound) => {
            return CheckOutcome::no_session("No saved session found. Please connect Uber first.");
        }
        Err(e) => {
            warn!("Session vault unreadable: {}", e);
            return CheckOutcome::fail(&e.to_string());
        }
    };

    match restore_and_open(cfg, manager, &state).await {
        Ok(true) => CheckOutcome::ok_with("Uber page opened for manual date setting"),
        Ok(false) => {
            manager.close_interactive().await;
            CheckOutcome::expired()
        }
        Err(e) => {
            error!("Could not open the dashboard: {}", e);
            manager.close_interactive().await;
            CheckOutcome::fail(&e.to_string())
        }
    }
}

// Ok(false) means the dashboard bounced us to the auth gateway.
async fn restore_and_open(
    cfg: &Config,
    manager: &SessionManager,
    state: &SessionState,
) -> Result<bool, DriverError> {
    let tab = manager.open_interactive().await?;
    chrome::set_cookies(&tab, chrome::state_to_cookie_params(state)).await?;
    chrome::navigate(&tab, &cfg.earnings_url(), timeouts::NAV_FULL).await?;
    if client::is_auth_url(&tab.get_url()) {
        return Ok(false);
    }
    // Readiness hint only; a slow page is still a usable page.
    if !chrome::wait_for_text(&tab, &client::EARNINGS_VOCAB, timeouts::SETUP_VOCAB).await {
        debug!("Earnings vocabulary did not appear before the wait ran out");
    }
    Ok(true)
}

// --- Extraction and report commands ---

/// Walks the driver table in the window manual setup left open and writes
/// the workbook. The run owns the window from the moment it starts and
/// tears it down on every exit path.
pub async fn run_extraction(cfg: &Config, manager: &SessionManager) -> RunOutcome {
    let Some(tab) = manager.interactive_tab().await else {
        return RunOutcome::fail("No browser session found. Please open Uber page first.");
    };
    if !client::on_earnings_page(&tab.get_url()) {
        return RunOutcome::fail(
            "Browser is not on the earnings page. Please navigate to earnings page.",
        );
    }
    drop(tab);
    let Some((browser, tab)) = manager.take_interactive().await else {
        return RunOutcome::fail("No browser session found. Please open Uber page first.");
    };

    info!("Starting extraction with the manually selected date range");
    let driver = ChromeDriver::new(tab);
    let result = orchestrator::run(&driver, cfg).await;
    drop(driver);
    manager::close_browser(browser).await;

    match result {
        Ok(outcome) => {
            let pages = outcome.pages_processed;
            let doc = ReportDocument::assemble(outcome.records, outcome.range);
            let count = doc.records.len();
            match workbook::write(&doc, &cfg.out_dir) {
                Ok(path) => {
                    info!("Report written to {}", path.display());
                    RunOutcome::done(path, count, pages)
                }
                Err(e) => {
                    error!("Report write failed: {}", e);
                    RunOutcome::fail(&format!("Failed to write the report: {}", e))
                }
            }
        }
        Err(e) => {
            warn!("Extraction run ended without a report: {}", e);
            RunOutcome::fail(&e.to_string())
        }
    }
}

/// Renders the workbook at `workbook_path` into a PDF saved beside it.
pub async fn export_pdf(workbook_path: &Path, manager: &SessionManager) -> ActionOutcome {
    if !workbook_path.exists() {
        return ActionOutcome::fail("Excel file not found");
    }
    let grid = match pdf::load_sheet(workbook_path) {
        Ok(grid) => grid,
        Err(e) => {
            error!("Could not read the workbook back: {}", e);
            return ActionOutcome::fail(&e.to_string());
        }
    };
    let html = pdf::render_html(&grid);

    let stage = std::env::temp_dir().join(format!(
        "fleet-report-{}.html",
        chrono::Utc::now().timestamp_millis()
    ));
    if let Err(e) = std::fs::write(&stage, &html) {
        error!("Could not stage the print page: {}", e);
        return ActionOutcome::fail(&format!("Failed to stage the print page: {}", e));
    }

    let printed = print_staged(manager, &stage).await;
    if let Err(e) = std::fs::remove_file(&stage) {
        debug!("Leaving temp print page behind: {}", e);
    }

    let bytes = match printed {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("PDF print failed: {}", e);
            return ActionOutcome::fail(&format!("PDF generation failed: {}", e));
        }
    };
    let out = pdf::pdf_path(workbook_path);
    match std::fs::write(&out, &bytes) {
        Ok(()) => {
            info!("PDF written to {}", out.display());
            ActionOutcome::with_file(out)
        }
        Err(e) => {
            error!("Could not write the PDF: {}", e);
            ActionOutcome::fail(&format!("Failed to write the PDF: {}", e))
        }
    }
}

async fn print_staged(manager: &SessionManager, page: &Path) -> Result<Vec<u8>, DriverError> {
    let tab = manager.warm_tab().await?;
    let url = format!("file://{}", page.display());
    chrome::navigate(&tab, &url, timeouts::NAV_PROBE).await?;
    chrome::print_pdf(&tab, pdf::print_options()).await
}

/// Opens the system file manager with `path` selected.
pub fn reveal_file(path: &Path) -> ActionOutcome {
    if !path.exists() {
        return ActionOutcome::fail("File not found");
    }
    match opener::reveal(path) {
        Ok(()) => ActionOutcome::ok(),
        Err(e) => {
            error!("Reveal failed: {}", e);
            ActionOutcome::fail(&format!("Could not reveal the file: {}", e))
        }
    }
}
