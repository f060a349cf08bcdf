//! Session establishment. The operator signs in through the browser window; the engine
//! only watches for it.

use std::time::Duration;

use tracing::{info, warn};

use crate::browser::{Browser, BrowserError, Locator};
use crate::errors::EngineError;
use crate::site::SessionMarker;
use crate::state::EngineState;
use crate::throttle::Pace;

const RECHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Opens the site home page and waits until the session looks signed in.
pub async fn ensure_signed_in(state: &EngineState) -> Result<(), EngineError> {
    let browser = state.browser.as_ref();
    let profile = state.profile;

    if let Err(e) = browser.navigate(profile.home_url).await {
        if e.is_fatal() {
            return Err(e.into());
        }
        warn!(site = profile.tag, "Home page did not load cleanly: {}", e);
    }
    state.throttle.wait(5.0, Pace::Scan).await;

    if signed_in(browser, &profile.session).await? {
        info!(site = profile.tag, "Session is signed in");
        return Ok(());
    }

    info!(
        site = profile.tag,
        "Please sign in using the browser window; waiting up to {}s",
        state.login_timeout.as_secs()
    );
    let mut waited = Duration::ZERO;
    while waited < state.login_timeout {
        state.control.checkpoint().await?;
        tokio::time::sleep(RECHECK_INTERVAL).await;
        waited += RECHECK_INTERVAL;
        if signed_in(browser, &profile.session).await? {
            info!(site = profile.tag, "Signed in, starting search");
            return Ok(());
        }
    }
    Err(EngineError::NotLoggedIn {
        waited_secs: waited.as_secs(),
    })
}

async fn signed_in(browser: &dyn Browser, marker: &SessionMarker) -> Result<bool, BrowserError> {
    let (locator, present_means_signed_in) = match marker {
        SessionMarker::SignedOutWhenPresent(l) => (l, false),
        SessionMarker::SignedInWhenPresent(l) => (l, true),
    };
    let present = visible(browser, locator).await?;
    Ok(present == present_means_signed_in)
}

async fn visible(browser: &dyn Browser, locator: &Locator) -> Result<bool, BrowserError> {
    let elements = match browser.find_all(None, locator).await {
        Ok(els) => els,
        Err(e) if e.is_fatal() => return Err(e),
        Err(_) => return Ok(false),
    };
    for element in elements {
        match browser.is_interactable(&element).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => {}
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_helpers::{engine_state, FakeBrowser, InMemoryControl};
    use crate::site::seek;
    use std::sync::Arc;

    fn sign_in_link() -> &'static str {
        match &seek::PROFILE.session {
            SessionMarker::SignedOutWhenPresent(l) | SessionMarker::SignedInWhenPresent(l) => {
                l.value()
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_in_session_passes_straight_through() {
        let browser = Arc::new(FakeBrowser::new());
        let control = Arc::new(InMemoryControl::default());
        let state = engine_state(browser.clone(), control, &seek::PROFILE);

        ensure_signed_in(&state).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_sign_in_never_happens() {
        let browser = Arc::new(FakeBrowser::new());
        browser.add_element(seek::PROFILE.home_url, sign_in_link(), "Sign in");
        let control = Arc::new(InMemoryControl::default());
        let state = engine_state(browser.clone(), control, &seek::PROFILE)
            .with_login_timeout(Duration::from_secs(20));

        let err = ensure_signed_in(&state).await.unwrap_err();
        assert!(matches!(err, EngineError::NotLoggedIn { waited_secs: 20 }));
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detects_sign_in_while_waiting() {
        let browser = Arc::new(FakeBrowser::new());
        let link = browser.add_element(seek::PROFILE.home_url, sign_in_link(), "Sign in");
        let control = Arc::new(InMemoryControl::default());
        let state = engine_state(browser.clone(), control, &seek::PROFILE);

        let signer = {
            let browser = browser.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                browser.set_interactable(&link, false);
            })
        };
        ensure_signed_in(&state).await.unwrap();
        signer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_the_wait() {
        let browser = Arc::new(FakeBrowser::new());
        browser.add_element(seek::PROFILE.home_url, sign_in_link(), "Sign in");
        let control = Arc::new(InMemoryControl::default());
        control.set_stop(true);
        let state = engine_state(browser.clone(), control, &seek::PROFILE);

        let err = ensure_signed_in(&state).await.unwrap_err();
        assert!(matches!(err, EngineError::Stopped));
    }
}
