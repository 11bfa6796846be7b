// src/config.rs
use std::path::PathBuf;

/// Supplier org the reports are pulled for when no override is given.
pub const DEFAULT_ORG_ID: &str = "4e7e783a-5d53-4c1c-a683-ef15c6ddbeae";

/// Currency token the dashboard renders amounts in.
pub const DEFAULT_CURRENCY: &str = "AED";

/// Hard cap on table pages walked in a single run.
pub const DEFAULT_MAX_PAGES: u32 = 10;

const SUPPLIER_BASE: &str = "https://supplier.uber.com";

/// Host the dashboard bounces to when a session is no longer valid.
pub const AUTH_HOST: &str = "auth.uber.com";

/// How the AES key for the session vault is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// OS credential store (generates and persists a random key on first use).
    Keyring,
    /// Key derived from stable machine identity; no credential store needed.
    Machine,
}

/// Runtime configuration. Built from env once at startup, then CLI flags may
/// override individual fields before commands run.
#[derive(Debug, Clone)]
pub struct Config {
    pub org_id: String,
    pub currency: String,
    /// Where generated reports land.
    pub out_dir: PathBuf,
    pub max_pages: u32,
    pub key_strategy: KeyStrategy,
    /// When set, failing pages are dumped here for offline inspection.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            org_id: DEFAULT_ORG_ID.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            out_dir: dirs::desktop_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            max_pages: DEFAULT_MAX_PAGES,
            key_strategy: KeyStrategy::Keyring,
            snapshot_dir: None,
        }
    }
}

impl Config {
    /// Builds the configuration, applying `FLEET_*` environment overrides.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();

        if let Ok(org) = std::env::var("FLEET_ORG_ID") {
            if !org.trim().is_empty() {
                cfg.org_id = org.trim().to_string();
            }
        }
        if let Ok(cur) = std::env::var("FLEET_CURRENCY") {
            if !cur.trim().is_empty() {
                cfg.currency = cur.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var("FLEET_OUT_DIR") {
            if !dir.trim().is_empty() {
                cfg.out_dir = PathBuf::from(dir);
            }
        }
        if let Ok(pages) = std::env::var("FLEET_MAX_PAGES") {
            match pages.trim().parse::<u32>() {
                Ok(n) if n > 0 => cfg.max_pages = n,
                _ => tracing::warn!("Ignoring invalid FLEET_MAX_PAGES value: {}", pages),
            }
        }
        if let Ok(strategy) = std::env::var("FLEET_KEY_STRATEGY") {
            match strategy.trim().to_ascii_lowercase().as_str() {
                "keyring" => cfg.key_strategy = KeyStrategy::Keyring,
                "machine" => cfg.key_strategy = KeyStrategy::Machine,
                other => tracing::warn!("Unknown FLEET_KEY_STRATEGY: {}", other),
            }
        }
        if let Ok(dir) = std::env::var("FLEET_SNAPSHOT_DIR") {
            if !dir.trim().is_empty() {
                cfg.snapshot_dir = Some(PathBuf::from(dir));
            }
        }

        tracing::debug!(
            "Config: org={} currency={} out_dir={} max_pages={}",
            cfg.org_id,
            cfg.currency,
            cfg.out_dir.display(),
            cfg.max_pages
        );
        cfg
    }

    /// Vehicles page for the configured org. Login flows land here first.
    pub fn vehicles_url(&self) -> String {
        format!("{}/orgs/{}/vehicles", SUPPLIER_BASE, self.org_id)
    }

    /// Weekly earnings page the extraction runs against.
    pub fn earnings_url(&self) -> String {
        format!("{}/orgs/{}/earnings", SUPPLIER_BASE, self.org_id)
    }

    /// Encrypted session file, in a stable per-user location.
    pub fn vault_path(&self) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fleet-reporter")
            .join("session.enc")
    }
}

/// Timing constants for browser interaction. The dashboard is a client-side
/// rendered app, so most waits are settle delays after actions rather than
/// navigation waits.
pub mod timeouts {
    use std::time::Duration;

    /// Ceiling for the details panel becoming visible after a row click.
    pub const PANEL_VISIBLE: Duration = Duration::from_secs(4);
    /// Poll interval while waiting for the panel.
    pub const PANEL_POLL: Duration = Duration::from_millis(150);
    /// After toggling a collapsed section open.
    pub const EXPAND_SETTLE: Duration = Duration::from_millis(200);
    /// After clicking a section label as an expand fallback.
    pub const LABEL_SETTLE: Duration = Duration::from_millis(150);
    /// After pressing Escape to close the panel.
    pub const PANEL_CLOSE_SETTLE: Duration = Duration::from_millis(300);
    /// After a page flip, before trusting the new row set.
    pub const PAGE_SETTLE: Duration = Duration::from_millis(500);
    /// After re-querying rows on a fresh page.
    pub const ROW_REFRESH_SETTLE: Duration = Duration::from_millis(400);
    /// After opening the rows-per-page menu.
    pub const ROWS_MENU_SETTLE: Duration = Duration::from_millis(400);
    /// After picking a rows-per-page option.
    pub const ROWS_PICK_SETTLE: Duration = Duration::from_millis(500);
    /// Budget for network quiescence after pagination.
    pub const NETWORK_IDLE: Duration = Duration::from_secs(5);
    /// Full navigation (manual setup opening the earnings page).
    pub const NAV_FULL: Duration = Duration::from_secs(15);
    /// Quick navigation used by session checks.
    pub const NAV_PROBE: Duration = Duration::from_secs(6);
    /// HTTP probe request budget.
    pub const HTTP_PROBE: Duration = Duration::from_secs(6);
    /// Waiting for earnings vocabulary during a session check.
    pub const VOCAB_WAIT: Duration = Duration::from_secs(5);
    /// Waiting for earnings vocabulary after a manual-setup navigation.
    pub const SETUP_VOCAB: Duration = Duration::from_secs(10);
    /// Confirming the dashboard rendered before persisting a login session.
    pub const LOGIN_VALIDATE: Duration = Duration::from_secs(4);
    /// Keep idle browsers alive; logins and manual setup take minutes.
    pub const IDLE_BROWSER: Duration = Duration::from_secs(3600);
}
