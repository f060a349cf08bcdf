//! Drives one posting from its detail page to a terminal state.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::form_fill::{self, TextAreaKind};
use super::{choose_control, fill_control, locate, recovery, transient_default};
use crate::browser::{first_present, Browser, BrowserError, ControlKind, FormControl, Locator};
use crate::documents::answers::direct_answer;
use crate::documents::JobContext;
use crate::errors::EngineError;
use crate::models::attempt::{ApplicationAttempt, AttemptState, FailReason, SkipReason};
use crate::state::EngineState;
use crate::throttle::Pace;

/// Form pages walked before giving up on an attempt.
pub const MAX_FORM_PAGES: u8 = 6;
const MIN_DESCRIPTION_CHARS: usize = 50;
const CONFIRMATION_POLL: Duration = Duration::from_secs(1);

/// What pressing the page's onward control did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Onward {
    Continued,
    Submitted,
    Stuck,
}

pub struct AttemptRunner<'a> {
    state: &'a EngineState,
    attempt: ApplicationAttempt,
    description: String,
}

impl<'a> AttemptRunner<'a> {
    pub fn new(state: &'a EngineState, title: &str, company: &str, url: &str) -> Self {
        Self {
            state,
            attempt: ApplicationAttempt::new(title, company, url),
            description: String::new(),
        }
    }

    pub fn attempt(&self) -> &ApplicationAttempt {
        &self.attempt
    }

    pub fn into_attempt(self) -> ApplicationAttempt {
        self.attempt
    }

    /// Runs the attempt to a terminal state.
    ///
    /// Transient browser faults end the attempt as `Failed` and return `Ok`. A stop or a
    /// fatal fault abandons the attempt and is returned for the run loop to act on.
    pub async fn drive(&mut self) -> Result<(), EngineError> {
        match self.drive_inner().await {
            Ok(()) => Ok(()),
            Err(EngineError::Browser(e)) if !e.is_fatal() => {
                warn!(
                    title = %self.attempt.title,
                    company = %self.attempt.company,
                    page = self.attempt.page().unwrap_or(0),
                    kind = e.kind(),
                    "Browser fault during application: {}",
                    e
                );
                self.finish(AttemptState::Failed(FailReason::Browser(e.kind())))
            }
            Err(e) => {
                self.attempt.abandon();
                if matches!(e, EngineError::Stopped) {
                    info!(title = %self.attempt.title, "Attempt abandoned on stop");
                }
                Err(e)
            }
        }
    }

    fn finish(&mut self, next: AttemptState) -> Result<(), EngineError> {
        debug!(attempt = %self.attempt.id, from = %self.attempt.state(), to = %next, "Attempt finished");
        self.attempt.advance(next)?;
        Ok(())
    }

    fn job(&self) -> JobContext<'_> {
        JobContext {
            title: &self.attempt.title,
            company: &self.attempt.company,
            description: &self.description,
        }
    }

    async fn drive_inner(&mut self) -> Result<(), EngineError> {
        let state = self.state;
        let browser = state.browser.as_ref();
        let profile = state.profile;

        if self.attempt.url.is_empty() {
            return self.finish(AttemptState::Failed(FailReason::Navigation(
                "posting has no link".to_string(),
            )));
        }
        if let Err(e) = browser.open_in_new_tab(&self.attempt.url).await {
            if e.is_fatal() {
                return Err(e.into());
            }
            warn!(title = %self.attempt.title, kind = e.kind(), "Posting did not open: {}", e);
            return self.finish(AttemptState::Failed(FailReason::Navigation(e.to_string())));
        }
        self.attempt.advance(AttemptState::Opened)?;
        state.throttle.wait(2.0, Pace::Scan).await;
        state.humanizer.page_behavior(browser).await;

        self.description = read_description(browser, profile.description).await?;
        if let Some(strict) = &state.strict {
            let verdict = strict.check(&self.attempt.title, &self.description).await;
            if !verdict.accept {
                return self.finish(AttemptState::Skipped(SkipReason::NotRelevant(
                    verdict.reason,
                )));
            }
        }
        self.attempt.advance(AttemptState::RelevanceChecked)?;

        let apply = match locate(browser, profile.apply).await? {
            Some(found) => found,
            None => {
                let reason = if locate(browser, profile.external).await?.is_some() {
                    SkipReason::ExternalSite
                } else {
                    SkipReason::NoApplyAffordance
                };
                return self.finish(AttemptState::Skipped(reason));
            }
        };

        state.control.checkpoint().await?;
        state.humanizer.before_click().await;
        browser.click(&apply.element).await?;
        info!(title = %self.attempt.title, "Apply form opened");
        state.throttle.wait(3.0, Pace::Apply).await;
        browser.focus_newest_tab().await?;
        self.attempt.advance(AttemptState::FormPage(1))?;

        self.walk_form().await
    }

    async fn walk_form(&mut self) -> Result<(), EngineError> {
        let state = self.state;
        loop {
            let page = self.attempt.page().unwrap_or(1);
            state.control.checkpoint().await?;
            self.clear_blockers().await?;

            if page == 1 {
                self.fill_first_page().await?;
            } else {
                self.fill_page().await?;
            }

            state.control.checkpoint().await?;
            let mut onward = self.press_onward().await?;
            if onward == Onward::Stuck {
                warn!(title = %self.attempt.title, page, "No continue or submit control");
                return self.finish(AttemptState::Failed(FailReason::NoContinue { page }));
            }
            self.clear_blockers().await?;

            if self.validation_showing().await? {
                if !self.attempt.begin_recovery()? {
                    return self.finish(AttemptState::Failed(FailReason::ValidationUnresolved {
                        page,
                    }));
                }
                warn!(title = %self.attempt.title, page, "Form reports missing answers");
                let filled =
                    recovery::recover(state, &mut self.attempt, &self.description).await?;
                info!(title = %self.attempt.title, page, filled, "Recovery pass done");

                state.control.checkpoint().await?;
                onward = self.press_onward().await?;
                if onward == Onward::Stuck || self.validation_showing().await? {
                    warn!(title = %self.attempt.title, page, "Form still reports errors");
                    return self.finish(AttemptState::Failed(FailReason::ValidationUnresolved {
                        page,
                    }));
                }
            }

            if self.await_confirmation(onward == Onward::Submitted).await? {
                return self.finish(AttemptState::Submitted);
            }
            if onward == Onward::Submitted {
                warn!(title = %self.attempt.title, page, "Submitted but no confirmation seen");
                return self.finish(AttemptState::Failed(FailReason::Unconfirmed));
            }
            if page >= MAX_FORM_PAGES {
                return self.finish(AttemptState::Failed(FailReason::PageLimit));
            }
            self.attempt.advance(AttemptState::FormPage(page + 1))?;
            debug!(title = %self.attempt.title, page = page + 1, "Next form page");
        }
    }

    /// Page 1: document choices and long-form text only.
    async fn fill_first_page(&mut self) -> Result<(), EngineError> {
        let state = self.state;
        for control in snapshot(state.browser.as_ref()).await? {
            match control.kind {
                ControlKind::TextArea => match form_fill::classify_text_area(&control) {
                    Some(TextAreaKind::CoverLetter) => {
                        if let Some(letter) = self.cover_letter().await {
                            fill_control(state, &control, &letter).await?;
                        }
                    }
                    Some(kind) if !control.is_answered() => {
                        if let Some(text) = self.long_text(kind, &control.question).await {
                            fill_control(state, &control, &text).await?;
                        }
                    }
                    _ => {}
                },
                ControlKind::TextInput => {
                    if control.is_answered() {
                        continue;
                    }
                    if let Some(answer) = direct_answer(&control, state.documents.profile()) {
                        fill_control(state, &control, &answer).await?;
                    }
                }
                ControlKind::Radio | ControlKind::Checkbox | ControlKind::Select => {
                    if let Some(index) =
                        form_fill::document_choice(&control.question, &control.options)
                    {
                        if !control.selected.contains(&index) {
                            choose_control(state, &control, index).await?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Pages after the first: every unanswered control, heuristics first.
    async fn fill_page(&mut self) -> Result<(), EngineError> {
        let state = self.state;
        let salary = state.snapshot.expected_salary;
        for control in snapshot(state.browser.as_ref()).await? {
            if control.is_answered() {
                continue;
            }
            match control.kind {
                ControlKind::TextInput => {
                    let answer = match direct_answer(&control, state.documents.profile()) {
                        Some(answer) => Some(answer),
                        None if form_fill::has_question(&control) => {
                            self.screening(&control.question).await
                        }
                        None => None,
                    };
                    if let Some(answer) = answer {
                        fill_control(state, &control, &answer).await?;
                    }
                }
                ControlKind::TextArea => {
                    let text = match form_fill::classify_text_area(&control) {
                        Some(TextAreaKind::CoverLetter) => self.cover_letter().await,
                        Some(kind) => self.long_text(kind, &control.question).await,
                        None => None,
                    };
                    if let Some(text) = text {
                        fill_control(state, &control, &text).await?;
                    }
                }
                ControlKind::Radio | ControlKind::Checkbox | ControlKind::Select => {
                    for index in form_fill::choices_for(&control, salary) {
                        choose_control(state, &control, index).await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn cover_letter(&mut self) -> Option<String> {
        if self.attempt.cover_letter.is_none() {
            self.attempt.cover_letter = self.state.documents.cover_letter(self.job()).await;
        }
        self.attempt.cover_letter.clone()
    }

    async fn long_text(&mut self, kind: TextAreaKind, question: &str) -> Option<String> {
        match kind {
            TextAreaKind::CoverLetter => self.cover_letter().await,
            TextAreaKind::SelectionCriteria => {
                if self.attempt.selection_criteria.is_none() {
                    self.attempt.selection_criteria =
                        self.state.documents.selection_criteria(self.job()).await;
                }
                self.attempt.selection_criteria.clone()
            }
            TextAreaKind::Screening => self.screening(question).await,
        }
    }

    async fn screening(&mut self, question: &str) -> Option<String> {
        if let Some(answer) = self.attempt.answers.get(question) {
            return Some(answer.clone());
        }
        let answer = self
            .state
            .documents
            .screening_answer(self.job(), question)
            .await?;
        self.attempt
            .answers
            .insert(question.to_string(), answer.clone());
        Some(answer)
    }

    /// Clicks continue, or submit when there is no continue.
    async fn press_onward(&self) -> Result<Onward, EngineError> {
        let state = self.state;
        let browser = state.browser.as_ref();
        let profile = state.profile;

        if let Some(next) = locate(browser, profile.advance).await? {
            state.humanizer.before_click().await;
            browser.click(&next.element).await?;
            debug!(title = %self.attempt.title, "Continue clicked");
            state.throttle.wait(2.0, Pace::Apply).await;
            return Ok(Onward::Continued);
        }
        if let Some(submit) = locate(browser, profile.submit).await? {
            state.humanizer.before_click().await;
            browser.click(&submit.element).await?;
            info!(title = %self.attempt.title, "Submit clicked");
            state.throttle.wait(3.0, Pace::Apply).await;
            return Ok(Onward::Submitted);
        }
        Ok(Onward::Stuck)
    }

    /// Dismisses a "Try again" popup and clears any verification challenge.
    async fn clear_blockers(&self) -> Result<(), EngineError> {
        let state = self.state;
        let browser = state.browser.as_ref();

        if let Some(popup) = locate(browser, state.profile.try_again).await? {
            warn!(title = %self.attempt.title, "Error popup shown, dismissing");
            match browser.click(&popup.element).await {
                Ok(()) => state.throttle.wait(2.0, Pace::Apply).await,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => warn!(kind = e.kind(), "Popup did not dismiss: {}", e),
            }
        }
        if !state.challenges.resolve_if_present(browser).await? {
            warn!(title = %self.attempt.title, "Verification challenge still showing");
        }
        Ok(())
    }

    async fn validation_showing(&self) -> Result<bool, BrowserError> {
        let browser = self.state.browser.as_ref();
        for element in first_present(browser, None, self.state.profile.validation).await? {
            match browser.is_interactable(&element).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {}
            }
        }
        Ok(false)
    }

    /// Checks for the confirmation page. After a submit click the check is repeated until
    /// the element timeout, since the confirmation can load slowly.
    async fn await_confirmation(&self, after_submit: bool) -> Result<bool, BrowserError> {
        let timeout = if after_submit {
            self.state.throttle.element_timeout()
        } else {
            Duration::ZERO
        };
        let mut waited = Duration::ZERO;
        loop {
            if self.confirmed().await? {
                return Ok(true);
            }
            if waited >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(CONFIRMATION_POLL).await;
            waited += CONFIRMATION_POLL;
        }
    }

    async fn confirmed(&self) -> Result<bool, BrowserError> {
        let browser = self.state.browser.as_ref();
        let url = transient_default(browser.current_url().await)?;
        let text = transient_default(browser.page_text().await)?;
        Ok((self.state.profile.confirmed)(&url, &text))
    }
}

/// First description block with real content, or empty.
async fn read_description(
    browser: &dyn Browser,
    locators: &[Locator],
) -> Result<String, BrowserError> {
    for locator in locators {
        let elements = match browser.find_all(None, locator).await {
            Ok(els) => els,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => continue,
        };
        for element in elements {
            match browser.text(&element).await {
                Ok(text) if text.trim().chars().count() > MIN_DESCRIPTION_CHARS => {
                    return Ok(text.trim().to_string())
                }
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {}
            }
        }
    }
    Ok(String::new())
}

/// Form controls on the current page; a transient fault reads as an empty form.
pub(crate) async fn snapshot(browser: &dyn Browser) -> Result<Vec<FormControl>, BrowserError> {
    match browser.form_snapshot().await {
        Ok(controls) => Ok(controls),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(kind = e.kind(), "Could not read form: {}", e);
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_helpers::{
        add_quick_apply, control, engine_state_with, snapshot as parse_config, FakeBrowser,
        InMemoryControl, MemorySink, ScriptedLlm, DEFAULT_CONFIG,
    };
    use crate::site::seek;
    use std::sync::Arc;

    const JOB: &str = "https://www.seek.com.au/job/1";

    fn state_for(
        browser: Arc<FakeBrowser>,
        llm: Option<Arc<ScriptedLlm>>,
        config: &str,
    ) -> EngineState {
        engine_state_with(
            parse_config(config),
            browser,
            Arc::new(InMemoryControl::default()),
            Arc::new(MemorySink::default()),
            llm,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_apply_flow_reaches_submitted() {
        let browser = Arc::new(FakeBrowser::new());
        add_quick_apply(&browser, 1);
        let state = state_for(browser.clone(), None, DEFAULT_CONFIG);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();
        assert_eq!(runner.attempt().state(), &AttemptState::Submitted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_affordance_is_skipped() {
        let browser = Arc::new(FakeBrowser::new());
        browser.add_element(
            JOB,
            seek::PROFILE.external[0].locator.value(),
            "Apply on company site",
        );
        let state = state_for(browser.clone(), None, DEFAULT_CONFIG);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();
        assert_eq!(
            runner.attempt().state(),
            &AttemptState::Skipped(SkipReason::ExternalSite)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_without_apply_is_skipped() {
        let browser = Arc::new(FakeBrowser::new());
        let state = state_for(browser.clone(), None, DEFAULT_CONFIG);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();
        assert_eq!(
            runner.attempt().state(),
            &AttemptState::Skipped(SkipReason::NoApplyAffordance)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_posting_fails_navigation() {
        let browser = Arc::new(FakeBrowser::new());
        browser.make_unreachable(JOB);
        let state = state_for(browser.clone(), None, DEFAULT_CONFIG);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();
        assert!(matches!(
            runner.attempt().state(),
            AttemptState::Failed(FailReason::Navigation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_strict_check_rejection_skips_before_apply() {
        let browser = Arc::new(FakeBrowser::new());
        let flow = add_quick_apply(&browser, 1);
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"accept": false, "reason": "Role is sales-focused"}"#,
        ]));
        let config_text = DEFAULT_CONFIG.replace("\"gptJobCheck\": false", "\"gptJobCheck\": true");
        let state = state_for(browser.clone(), Some(llm.clone()), &config_text);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();
        assert!(matches!(
            runner.attempt().state(),
            AttemptState::Skipped(SkipReason::NotRelevant(reason)) if reason.contains("sales")
        ));
        assert!(!browser.clicks().contains(&flow.apply_button));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_form_hits_page_limit() {
        let browser = Arc::new(FakeBrowser::new());
        let flow = add_quick_apply(&browser, 1);
        // Continue never leaves the page.
        browser.on_click(&flow.continue_button, |_| {});
        let state = state_for(browser.clone(), None, DEFAULT_CONFIG);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();
        assert_eq!(
            runner.attempt().state(),
            &AttemptState::Failed(FailReason::PageLimit)
        );
        let continues = browser
            .clicks()
            .iter()
            .filter(|id| **id == flow.continue_button)
            .count();
        assert_eq!(continues, MAX_FORM_PAGES as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_confirmation_is_a_failure() {
        let browser = Arc::new(FakeBrowser::new());
        let flow = add_quick_apply(&browser, 1);
        browser.set_text(&flow.done_url, "Something went wrong");
        let state = state_for(browser.clone(), None, DEFAULT_CONFIG);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();
        assert_eq!(
            runner.attempt().state(),
            &AttemptState::Failed(FailReason::Unconfirmed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_overwrites_cover_letter_and_leaves_choices() {
        let browser = Arc::new(FakeBrowser::new());
        let flow = add_quick_apply(&browser, 1);
        let mut letter = control("cl", ControlKind::TextArea, "Cover letter", &[]);
        letter.value = Some("Template letter".to_string());
        browser.add_control(&flow.apply_url, letter);
        browser.add_control(
            &flow.apply_url,
            control("rights", ControlKind::Radio, "Do you have the right to work?", &["Yes", "No"]),
        );
        browser.add_control(
            &flow.apply_url,
            control(
                "resume",
                ControlKind::Radio,
                "Resume",
                &["Don't include a resume", "Select a resume"],
            ),
        );
        let llm = Arc::new(ScriptedLlm::replying(&["Dear Globex team, ..."]));
        let state = state_for(browser.clone(), Some(llm.clone()), DEFAULT_CONFIG);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();

        assert_eq!(runner.attempt().state(), &AttemptState::Submitted);
        let fills = browser.fills();
        assert!(fills.contains(&("cl".to_string(), "Dear Globex team, ...".to_string())));
        assert!(fills.contains(&("resume".to_string(), "Select a resume".to_string())));
        assert!(!fills.iter().any(|(id, _)| id == "rights"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_pages_use_heuristics() {
        let browser = Arc::new(FakeBrowser::new());
        let flow = add_quick_apply(&browser, 1);
        browser.add_control(
            &flow.review_url,
            control(
                "rights",
                ControlKind::Radio,
                "Which of the following statements best describes your right to work in Australia?",
                &[
                    "I require sponsorship",
                    "I'm an Australian citizen",
                    "I have a temporary visa",
                ],
            ),
        );
        browser.add_control(
            &flow.review_url,
            control("notice", ControlKind::TextInput, "What is your notice period?", &[]),
        );
        let state = state_for(browser.clone(), None, DEFAULT_CONFIG);

        let mut runner = AttemptRunner::new(&state, "Project Manager", "Globex", JOB);
        runner.drive().await.unwrap();

        let fills = browser.fills();
        assert!(fills.contains(&("rights".to_string(), "I'm an Australian citizen".to_string())));
        assert!(fills.contains(&("notice".to_string(), "2 weeks".to_string())));
        assert_eq!(runner.attempt().state(), &AttemptState::Submitted);
    }
}
