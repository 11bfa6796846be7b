// src/session/manager.rs
//
// Owns the live browser windows. One visible window for the user to sign
// in to and for extraction runs, and one hidden worker window for session
// checks and PDF printing. Both launch lazily and are reused while alive.
use std::sync::Arc;

use headless_chrome::{Browser, Tab};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::chrome;
use crate::utils::error::DriverError;

#[derive(Default)]
pub struct SessionManager {
    interactive: Mutex<Option<(Browser, Arc<Tab>)>>,
    warm: Mutex<Option<(Browser, Arc<Tab>)>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The visible window, launching one if none is open. An existing
    /// window is raised and reused; a window the user closed behind our
    /// back is detected and replaced.
    pub async fn open_interactive(&self) -> Result<Arc<Tab>, DriverError> {
        let mut slot = self.interactive.lock().await;
        if let Some((_, tab)) = slot.as_ref() {
            if chrome::activate(tab).await.is_ok() {
                debug!("Reusing the open browser window");
                return Ok(tab.clone());
            }
            warn!("Browser window is gone, launching a fresh one");
            *slot = None;
        }
        let (browser, tab) = chrome::launch_interactive()?;
        info!("Browser window opened");
        let handle = tab.clone();
        *slot = Some((browser, tab));
        Ok(handle)
    }

    /// The visible window's tab, if one is currently open. Never launches.
    pub async fn interactive_tab(&self) -> Option<Arc<Tab>> {
        self.interactive
            .lock()
            .await
            .as_ref()
            .map(|(_, tab)| tab.clone())
    }

    /// Hands the visible window to the caller; the manager forgets it and
    /// the caller owns the teardown.
    pub async fn take_interactive(&self) -> Option<(Browser, Arc<Tab>)> {
        self.interactive.lock().await.take()
    }

    pub async fn close_interactive(&self) {
        let taken = self.interactive.lock().await.take();
        if let Some((browser, tab)) = taken {
            drop(tab);
            close_browser(browser).await;
            info!("Browser window closed");
        }
    }

    /// The hidden worker window, launching it on first use.
    pub async fn warm_tab(&self) -> Result<Arc<Tab>, DriverError> {
        let mut slot = self.warm.lock().await;
        if let Some((_, tab)) = slot.as_ref() {
            if chrome::activate(tab).await.is_ok() {
                return Ok(tab.clone());
            }
            warn!("Hidden worker window is gone, launching a fresh one");
            *slot = None;
        }
        debug!("Launching the hidden worker window");
        let (browser, tab) = chrome::launch_headless()?;
        let handle = tab.clone();
        *slot = Some((browser, tab));
        Ok(handle)
    }

    /// Closes every window this manager still owns.
    pub async fn shutdown(&self) {
        self.close_interactive().await;
        let taken = self.warm.lock().await.take();
        if let Some((browser, tab)) = taken {
            drop(tab);
            close_browser(browser).await;
            debug!("Hidden worker window closed");
        }
    }
}

// Dropping a Browser waits on the child process; keep that off the async
// runtime threads.
pub(crate) async fn close_browser(browser: Browser) {
    let _ = tokio::task::spawn_blocking(move || drop(browser)).await;
}
