// src/supplier/client.rs
//
// Cheap session liveness probe. Instead of spinning up a browser window to
// find out whether the saved cookies still work, replay them over plain
// HTTP against the dashboard and watch where the redirects land: the auth
// gateway means the session is gone.
use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::redirect::Policy;
use reqwest::Url;
use tracing::{debug, warn};

use crate::config::{timeouts, Config, AUTH_HOST};
use crate::supplier::models::SessionState;
use crate::utils::error::ClientError;

// Pages behind login render this vocabulary; the auth gateway does not.
pub const EARNINGS_VOCAB: [&str; 2] = ["Driver earnings", "Earnings"];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProbe {
    Active,
    Expired,
}

/// Replays the saved cookies against the dashboard and reports whether the
/// session still holds. Network failures are errors, not "expired": a dead
/// proxy must not make the app discard a perfectly good session.
pub async fn probe_session(state: &SessionState, cfg: &Config) -> Result<SessionProbe, ClientError> {
    let (jar, loaded) = load_jar(state);
    if loaded == 0 {
        return Err(ClientError::State("saved session has no usable cookies".into()));
    }
    debug!("Probing session with {} cookies", loaded);

    let client = reqwest::Client::builder()
        .cookie_provider(jar)
        .redirect(Policy::limited(10))
        .timeout(timeouts::HTTP_PROBE)
        .user_agent(USER_AGENT)
        .build()?;

    let resp = client.get(cfg.earnings_url()).send().await?;
    let landed = resp.url().to_string();
    debug!("Session probe landed on {}", landed);
    if is_auth_url(&landed) {
        Ok(SessionProbe::Expired)
    } else {
        Ok(SessionProbe::Active)
    }
}

/// Whether a URL belongs to the auth gateway. Landing there while asking
/// for a dashboard page means the session expired.
pub fn is_auth_url(url: &str) -> bool {
    url.contains(AUTH_HOST)
}

/// Whether a URL sits anywhere on the supplier dashboard.
pub fn on_supplier_domain(url: &str) -> bool {
    url.contains("supplier.uber.com")
}

/// Whether a URL is the dashboard's earnings view, the only page the
/// extraction walk may start from.
pub fn on_earnings_page(url: &str) -> bool {
    on_supplier_domain(url) && url.contains("earnings")
}

// Fills a cookie jar from the stored session. Cookies are opaque JSON;
// ones missing a name or value are skipped with a note rather than
// sinking the probe.
fn load_jar(state: &SessionState) -> (Arc<Jar>, usize) {
    let jar = Arc::new(Jar::default());
    let mut loaded = 0usize;
    for cookie in &state.cookies {
        let name = cookie.get("name").and_then(|v| v.as_str());
        let value = cookie.get("value").and_then(|v| v.as_str());
        let (Some(name), Some(value)) = (name, value) else {
            warn!("Skipping stored cookie without name/value");
            continue;
        };
        let domain = cookie
            .get("domain")
            .and_then(|v| v.as_str())
            .unwrap_or("supplier.uber.com");
        let path = cookie.get("path").and_then(|v| v.as_str()).unwrap_or("/");

        let anchor = format!("https://{}/", domain.trim_start_matches('.'));
        let Ok(anchor_url) = Url::parse(&anchor) else {
            warn!("Skipping cookie {:?} with unusable domain {:?}", name, domain);
            continue;
        };
        jar.add_cookie_str(
            &format!("{}={}; Domain={}; Path={}", name, value, domain, path),
            &anchor_url,
        );
        loaded += 1;
    }
    (jar, loaded)
}
