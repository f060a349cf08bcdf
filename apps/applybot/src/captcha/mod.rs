//! Challenge resolver: detects bot-verification widgets and clears them when it can.
//!
//! With a solving-service credential the site key is sent to the service and the returned
//! token is injected into the page. Without one, or when solving fails, the resolver waits
//! a bounded time for a human to solve it, then lets the attempt carry on either way.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::browser::{scripts, Browser, BrowserError, Locator};
use crate::control::ControlGate;
use crate::errors::EngineError;

pub mod detect;
pub mod two_captcha;

pub use detect::ChallengeKind;
pub use two_captcha::TwoCaptchaSolver;

pub const MANUAL_WAIT: Duration = Duration::from_secs(30);
const MANUAL_WAIT_SLICE: Duration = Duration::from_secs(1);
const AFTER_INJECT_PAUSE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error code returned by the service, e.g. ERROR_ZERO_BALANCE.
    #[error("Solving service error: {0}")]
    Service(String),

    #[error("Solving service gave no answer within {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Returns the response token for the challenge.
    async fn solve(
        &self,
        kind: ChallengeKind,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, SolverError>;
}

pub struct ChallengeResolver {
    solver: Option<Arc<dyn ChallengeSolver>>,
    gate: ControlGate,
    manual_wait: Duration,
}

impl ChallengeResolver {
    pub fn new(solver: Option<Arc<dyn ChallengeSolver>>, gate: ControlGate) -> Self {
        Self {
            solver,
            gate,
            manual_wait: MANUAL_WAIT,
        }
    }

    /// `Ok(true)` when no challenge is showing or one was cleared; `Ok(false)` when a
    /// challenge is still present after every fallback. Only a stop or a fatal browser
    /// fault is an error.
    pub async fn resolve_if_present(&self, browser: &dyn Browser) -> Result<bool, EngineError> {
        let (source, frames) = match inspect(browser).await {
            Ok(found) => found,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("Could not inspect page for challenges: {}", e);
                return Ok(true);
            }
        };
        let kind = match detect::detect(&source, &frames) {
            Some(kind) => kind,
            None => return Ok(true),
        };
        warn!("{} challenge detected", kind);

        if let Some(solver) = &self.solver {
            match detect::extract_site_key(&source, &frames) {
                Some(site_key) => {
                    let solved = self
                        .solve_and_inject(browser, solver.as_ref(), kind, &site_key)
                        .await;
                    match solved {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => warn!("{} token could not be injected: {}", kind, e),
                    }
                }
                None => warn!("{} site key not found", kind),
            }
        } else {
            info!("No solving-service key configured");
        }

        self.manual_wait(kind).await?;
        match inspect(browser).await {
            Ok((source, frames)) => Ok(detect::detect(&source, &frames).is_none()),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(_) => Ok(false),
        }
    }

    /// `Ok(false)` when the service could not solve it.
    async fn solve_and_inject(
        &self,
        browser: &dyn Browser,
        solver: &dyn ChallengeSolver,
        kind: ChallengeKind,
        site_key: &str,
    ) -> Result<bool, BrowserError> {
        let page_url = browser.current_url().await?;
        let token = match solver.solve(kind, site_key, &page_url).await {
            Ok(token) => token,
            Err(e) => {
                warn!("{} not solved by service: {}", kind, e);
                return Ok(false);
            }
        };
        let callbacks = browser
            .execute(scripts::INJECT_CHALLENGE_TOKEN, vec![json!(token)])
            .await?;
        info!(
            "{} token injected ({} callbacks fired)",
            kind,
            callbacks.as_u64().unwrap_or(0)
        );
        tokio::time::sleep(AFTER_INJECT_PAUSE).await;
        Ok(true)
    }

    /// Gives a human `manual_wait` to solve the challenge, checking for stop every second.
    async fn manual_wait(&self, kind: ChallengeKind) -> Result<(), EngineError> {
        info!(
            "Solve the {} in the browser window; continuing in {}s",
            kind,
            self.manual_wait.as_secs()
        );
        let mut waited = Duration::ZERO;
        while waited < self.manual_wait {
            if self.gate.stop_requested().await {
                return Err(EngineError::Stopped);
            }
            tokio::time::sleep(MANUAL_WAIT_SLICE).await;
            waited += MANUAL_WAIT_SLICE;
        }
        Ok(())
    }
}

async fn inspect(browser: &dyn Browser) -> Result<(String, Vec<String>), BrowserError> {
    let source = browser.page_source().await?;
    let mut frames = Vec::new();
    for frame in browser.find_all(None, &Locator::Css("iframe")).await? {
        if let Ok(Some(src)) = browser.attribute(&frame, "src").await {
            frames.push(src);
        }
    }
    Ok((source, frames))
}
