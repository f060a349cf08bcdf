//! Run loop.
//!
//! One run walks every configured target title in order: search, scan each results page
//! in DOM order, and drive one `ApplicationAttempt` per candidate that survives the title
//! filter. The loop ends when the submit ceiling is reached, the site runs out of result
//! pages, or the operator stops it.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Url;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::browser::{
    first_match, first_present, Browser, BrowserError, Element, FormControl, Located, Locator,
    Strategy,
};
use crate::errors::EngineError;
use crate::matching::TitleVerdict;
use crate::models::attempt::{ApplicationAttempt, AttemptState};
use crate::models::counters::RunCounters;
use crate::models::posting::PostingCandidate;
use crate::models::record::SubmissionRecord;
use crate::state::EngineState;
use crate::throttle::Pace;

pub mod attempt;
pub mod form_fill;
pub mod login;
pub mod recovery;
#[cfg(test)]
pub mod test_helpers;

use attempt::AttemptRunner;

const UNKNOWN: &str = "Unknown";

/// Final counters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: u32,
    pub skipped: u32,
    pub failed: u32,
    /// The run ended on an operator stop.
    pub stopped: bool,
    pub elapsed: Duration,
}

/// Per-run mutable progress. Dropped when the run returns.
struct RunProgress {
    counters: RunCounters,
    /// Posting URLs already attempted this run.
    seen: HashSet<String>,
}

pub struct Engine {
    state: EngineState,
}

impl Engine {
    pub fn new(state: EngineState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Runs until the ceiling is reached, results run out, or a stop is observed.
    ///
    /// A stop is a clean exit and yields `Ok`. Only fatal faults return `Err`; the final
    /// counters line is logged either way.
    pub async fn run(&self) -> Result<RunSummary, EngineError> {
        let started = Instant::now();
        let mut progress = RunProgress {
            counters: RunCounters::new(self.state.snapshot.max_jobs),
            seen: HashSet::new(),
        };
        info!(
            site = self.state.profile.tag,
            titles = self.state.snapshot.job_titles.len(),
            max_jobs = self.state.snapshot.max_jobs,
            "Run started"
        );

        let outcome = self.search_all(&mut progress).await;

        let summary = RunSummary {
            submitted: progress.counters.successful_submits(),
            skipped: progress.counters.skipped,
            failed: progress.counters.failed,
            stopped: matches!(outcome, Err(EngineError::Stopped)),
            elapsed: started.elapsed(),
        };
        info!(
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_secs = summary.elapsed.as_secs(),
            "Successfully submitted {} applications",
            summary.submitted
        );

        match outcome {
            Ok(()) => Ok(summary),
            Err(EngineError::Stopped) => {
                info!("Run stopped by operator");
                Ok(summary)
            }
            Err(e) => {
                error!(kind = e.kind(), "Run ended on a fatal fault: {}", e);
                Err(e)
            }
        }
    }

    async fn search_all(&self, progress: &mut RunProgress) -> Result<(), EngineError> {
        let state = &self.state;
        state.control.reset().await?;
        login::ensure_signed_in(state).await?;

        for title in &state.snapshot.job_titles {
            if progress.counters.ceiling_reached() {
                break;
            }
            state.control.checkpoint().await?;
            let alternate = state.control.alternate_mode().await;
            let url = state
                .profile
                .search_url(title, &state.snapshot.location, alternate)?;
            info!(search = %title, alternate_mode = alternate, "Searching");
            debug!(url = %url, "Search URL");

            if let Err(e) = state.browser.navigate(&url).await {
                if e.is_fatal() {
                    return Err(e.into());
                }
                warn!(search = %title, kind = e.kind(), "Search page did not load: {}", e);
                continue;
            }
            state.throttle.wait(3.0, Pace::Scan).await;
            self.walk_results(progress).await?;
        }

        if progress.counters.ceiling_reached() {
            info!("Reached maxJobs ({})", progress.counters.max_jobs());
        }
        Ok(())
    }

    async fn walk_results(&self, progress: &mut RunProgress) -> Result<(), EngineError> {
        let mut page = 1u32;
        loop {
            self.state.control.checkpoint().await?;
            let candidates = self.scan_results().await?;
            info!(page, found = candidates.len(), "Results page scanned");
            if candidates.is_empty() {
                return Ok(());
            }

            for candidate in &candidates {
                self.state.control.checkpoint().await?;
                if progress.counters.ceiling_reached() {
                    return Ok(());
                }
                self.consider(candidate, progress).await?;
            }

            if progress.counters.ceiling_reached() || !self.next_page().await? {
                return Ok(());
            }
            page += 1;
        }
    }

    /// Result cards on the current page, in DOM order. A card that cannot be read is
    /// skipped; only fatal faults end the scan.
    async fn scan_results(&self) -> Result<Vec<PostingCandidate>, BrowserError> {
        let browser = self.state.browser.as_ref();
        let base = transient_default(browser.current_url().await)?;
        let cards = first_present(browser, None, self.state.profile.cards).await?;

        let mut found = Vec::with_capacity(cards.len());
        for card in cards {
            match self.read_card(card, &base).await {
                Ok(Some(candidate)) => found.push(candidate),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(kind = e.kind(), "Skipping unreadable result card: {}", e),
            }
            self.state.throttle.scan_step().await;
        }
        Ok(found)
    }

    /// `None` for cards filtered out by the gate or without a link to open.
    async fn read_card(
        &self,
        card: Element,
        base: &str,
    ) -> Result<Option<PostingCandidate>, BrowserError> {
        let browser = self.state.browser.as_ref();
        let profile = self.state.profile;
        if !profile.card_gate.is_empty()
            && first_present(browser, Some(&card), profile.card_gate)
                .await?
                .is_empty()
        {
            return Ok(None);
        }
        let title = first_text(browser, &card, profile.card_title)
            .await?
            .unwrap_or_else(|| UNKNOWN.to_string());
        let company = first_text(browser, &card, profile.card_company)
            .await?
            .unwrap_or_else(|| UNKNOWN.to_string());
        let Some(url) = card_link(browser, &card, profile.card_link, base).await? else {
            debug!(title = %title, "Result card has no link");
            return Ok(None);
        };
        Ok(Some(PostingCandidate {
            title,
            company,
            card,
            url: Some(url),
        }))
    }

    async fn consider(
        &self,
        candidate: &PostingCandidate,
        progress: &mut RunProgress,
    ) -> Result<(), EngineError> {
        let state = &self.state;
        match state.filter.evaluate(&candidate.title, &candidate.company) {
            TitleVerdict::Blocked(entry) => {
                info!(title = %candidate.title, company = %candidate.company, "Blocked ({})", entry);
                return Ok(());
            }
            TitleVerdict::NoMatch => {
                info!(title = %candidate.title, "Skipped, title does not match");
                return Ok(());
            }
            TitleVerdict::Direct | TitleVerdict::Related(_) => {}
        }

        let url = candidate.url.clone().unwrap_or_default();
        if !url.is_empty() && !progress.seen.insert(url.clone()) {
            debug!(title = %candidate.title, "Already attempted this run");
            return Ok(());
        }

        info!(title = %candidate.title, company = %candidate.company, "Applying: {}", candidate.label());
        state.humanizer.random_pause().await;

        let mut runner = AttemptRunner::new(state, &candidate.title, &candidate.company, &url);
        let outcome = runner.drive().await;
        let attempt = runner.into_attempt();
        self.settle(&attempt, progress).await;

        // Tabs are closed even when the attempt unwinds on a stop.
        let closed = state.browser.close_extra_tabs().await;
        outcome?;
        if let Err(e) = closed {
            if e.is_fatal() {
                return Err(e.into());
            }
            warn!(kind = e.kind(), "Could not close attempt tabs: {}", e);
        }

        state.throttle.cooldown().await;
        state.humanizer.random_scroll(state.browser.as_ref()).await;
        Ok(())
    }

    /// Books a finished attempt into the counters and the record sink.
    async fn settle(&self, attempt: &ApplicationAttempt, progress: &mut RunProgress) {
        match attempt.state() {
            AttemptState::Submitted => {
                if !progress.counters.record_submit() {
                    return;
                }
                info!(
                    title = %attempt.title,
                    company = %attempt.company,
                    submitted = progress.counters.successful_submits(),
                    "Application submitted"
                );
                let record = SubmissionRecord::new(
                    &attempt.title,
                    &attempt.company,
                    &attempt.url,
                    self.state.profile.tag,
                );
                if let Err(e) = self.state.sink.append(&record).await {
                    let e = EngineError::from(e);
                    warn!(title = %attempt.title, kind = e.kind(), "Submission not recorded: {}", e);
                }
            }
            AttemptState::Skipped(reason) => {
                progress.counters.skipped += 1;
                info!(title = %attempt.title, company = %attempt.company, "Skipped: {:?}", reason);
            }
            AttemptState::Failed(reason) => {
                progress.counters.failed += 1;
                warn!(
                    title = %attempt.title,
                    company = %attempt.company,
                    "Application failed: {:?}",
                    reason
                );
            }
            other => {
                progress.counters.failed += 1;
                warn!(title = %attempt.title, state = %other, "Attempt ended without an outcome");
            }
        }
    }

    /// Clicks the next-page control. `false` when there is none.
    async fn next_page(&self) -> Result<bool, BrowserError> {
        let browser = self.state.browser.as_ref();
        let Some(next) = locate(browser, self.state.profile.next_page).await? else {
            info!("No more result pages");
            return Ok(false);
        };
        self.state.throttle.wait(0.5, Pace::Scan).await;
        match browser.click(&next.element).await {
            Ok(()) => {
                info!("Next results page");
                self.state.throttle.wait(3.0, Pace::Scan).await;
                Ok(true)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(kind = e.kind(), "Next page click failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// `first_match` with "nothing matched" folded into `None`.
pub(crate) async fn locate(
    browser: &dyn Browser,
    strategies: &[Strategy],
) -> Result<Option<Located>, BrowserError> {
    match first_match(browser, strategies).await {
        Ok(found) => Ok(Some(found)),
        Err(BrowserError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The value, or an empty string when the fault is transient.
pub(crate) fn transient_default(
    result: Result<String, BrowserError>,
) -> Result<String, BrowserError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_fatal() => Err(e),
        Err(_) => Ok(String::new()),
    }
}

/// Trimmed text of the first non-empty match inside `scope`.
async fn first_text(
    browser: &dyn Browser,
    scope: &Element,
    locators: &[Locator],
) -> Result<Option<String>, BrowserError> {
    for element in first_present(browser, Some(scope), locators).await? {
        match browser.text(&element).await {
            Ok(text) if !text.trim().is_empty() => return Ok(Some(text.trim().to_string())),
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => {}
        }
    }
    Ok(None)
}

/// Absolute detail-page URL from the card's link, resolved against the results page.
async fn card_link(
    browser: &dyn Browser,
    card: &Element,
    locators: &[Locator],
    base: &str,
) -> Result<Option<String>, BrowserError> {
    for link in first_present(browser, Some(card), locators).await? {
        let href = match browser.attribute(&link, "href").await {
            Ok(Some(href)) if !href.trim().is_empty() => href,
            Ok(_) => continue,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => continue,
        };
        let resolved = Url::parse(base)
            .and_then(|b| b.join(href.trim()))
            .map(|u| u.to_string())
            .unwrap_or(href);
        return Ok(Some(resolved));
    }
    Ok(None)
}

/// Types `text` into `control`. A transient fault is logged and reported as `false`.
pub(crate) async fn fill_control(
    state: &EngineState,
    control: &FormControl,
    text: &str,
) -> Result<bool, BrowserError> {
    match state.browser.fill_text(control, text).await {
        Ok(()) => {
            state.throttle.wait(0.2, Pace::Apply).await;
            Ok(true)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(question = %control.question, kind = e.kind(), "Could not fill field: {}", e);
            Ok(false)
        }
    }
}

/// Selects option `index` of `control`. A transient fault is logged and reported as `false`.
pub(crate) async fn choose_control(
    state: &EngineState,
    control: &FormControl,
    index: usize,
) -> Result<bool, BrowserError> {
    match state.browser.choose_option(control, index).await {
        Ok(()) => {
            debug!(
                question = %control.question,
                option = control.options.get(index).map(String::as_str).unwrap_or(""),
                "Option selected"
            );
            state.throttle.wait(0.2, Pace::Apply).await;
            Ok(true)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(question = %control.question, kind = e.kind(), "Could not select option: {}", e);
            Ok(false)
        }
    }
}
