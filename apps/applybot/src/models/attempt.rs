use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Recovery passes allowed per form page.
pub const MAX_RECOVERY_PER_PAGE: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The strict relevance check said no; carries the model's justification.
    NotRelevant(String),
    ExternalSite,
    NoApplyAffordance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// Operator stop while the attempt was in flight.
    Abandoned,
    Navigation(String),
    /// Errors still shown after the recovery pass on this page.
    ValidationUnresolved { page: u8 },
    PageLimit,
    NoContinue { page: u8 },
    /// Submit was clicked but no confirmation page followed.
    Unconfirmed,
    /// A browser fault interrupted the form; carries the fault kind.
    Browser(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Discovered,
    Opened,
    RelevanceChecked,
    FormPage(u8),
    ValidationRecovery(u8),
    Submitted,
    Failed(FailReason),
    Skipped(SkipReason),
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Submitted | AttemptState::Failed(_) | AttemptState::Skipped(_)
        )
    }

    fn allows(&self, next: &AttemptState) -> bool {
        use AttemptState::*;
        match (self, next) {
            (s, _) if s.is_terminal() => false,
            (_, Failed(_)) => true,
            (Discovered, Opened) => true,
            (Opened, RelevanceChecked) | (Opened, Skipped(_)) => true,
            (RelevanceChecked, FormPage(1)) | (RelevanceChecked, Skipped(_)) => true,
            (FormPage(n), FormPage(m)) => *m == n + 1,
            (FormPage(n), ValidationRecovery(m)) => m == n,
            (ValidationRecovery(n), FormPage(m)) => *m == n + 1,
            (FormPage(_), Submitted) | (ValidationRecovery(_), Submitted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Discovered => write!(f, "discovered"),
            AttemptState::Opened => write!(f, "opened"),
            AttemptState::RelevanceChecked => write!(f, "relevance-checked"),
            AttemptState::FormPage(n) => write!(f, "form-page-{n}"),
            AttemptState::ValidationRecovery(n) => write!(f, "validation-recovery-{n}"),
            AttemptState::Submitted => write!(f, "submitted"),
            AttemptState::Failed(r) => write!(f, "failed ({r:?})"),
            AttemptState::Skipped(r) => write!(f, "skipped ({r:?})"),
        }
    }
}

#[derive(Debug, Error)]
#[error("Illegal attempt transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: String,
    pub to: String,
}

/// One end-to-end application for a posting that passed the title filter.
#[derive(Debug)]
pub struct ApplicationAttempt {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub url: String,
    state: AttemptState,
    /// Generated cover letter, reused if the page is revisited.
    pub cover_letter: Option<String>,
    pub selection_criteria: Option<String>,
    /// Generated answers keyed by question text.
    pub answers: HashMap<String, String>,
    recovery_attempts: u8,
}

impl ApplicationAttempt {
    pub fn new(title: &str, company: &str, url: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            company: company.to_string(),
            url: url.to_string(),
            state: AttemptState::Discovered,
            cover_letter: None,
            selection_criteria: None,
            answers: HashMap::new(),
            recovery_attempts: 0,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    /// Current form page, if the attempt is inside the form.
    pub fn page(&self) -> Option<u8> {
        match self.state {
            AttemptState::FormPage(n) | AttemptState::ValidationRecovery(n) => Some(n),
            _ => None,
        }
    }

    pub fn advance(&mut self, next: AttemptState) -> Result<(), InvalidTransition> {
        if !self.state.allows(&next) {
            return Err(InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        if matches!(next, AttemptState::FormPage(_)) {
            self.recovery_attempts = 0;
        }
        self.state = next;
        Ok(())
    }

    /// Enters recovery for the current page if the per-page budget allows it.
    pub fn begin_recovery(&mut self) -> Result<bool, InvalidTransition> {
        let page = match self.state {
            AttemptState::FormPage(n) => n,
            _ => {
                return Err(InvalidTransition {
                    from: self.state.to_string(),
                    to: "validation-recovery".to_string(),
                })
            }
        };
        if self.recovery_attempts >= MAX_RECOVERY_PER_PAGE {
            return Ok(false);
        }
        self.recovery_attempts += 1;
        self.advance(AttemptState::ValidationRecovery(page))?;
        Ok(true)
    }

    pub fn recovery_attempts(&self) -> u8 {
        self.recovery_attempts
    }

    /// Marks the attempt abandoned unless it already ended.
    pub fn abandon(&mut self) {
        if !self.state.is_terminal() {
            self.state = AttemptState::Failed(FailReason::Abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened_form() -> ApplicationAttempt {
        let mut a = ApplicationAttempt::new("Project Manager", "Acme", "https://example.test/job/1");
        a.advance(AttemptState::Opened).unwrap();
        a.advance(AttemptState::RelevanceChecked).unwrap();
        a.advance(AttemptState::FormPage(1)).unwrap();
        a
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut a = opened_form();
        a.advance(AttemptState::FormPage(2)).unwrap();
        a.advance(AttemptState::Submitted).unwrap();
        assert!(a.state().is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut a = opened_form();
        a.advance(AttemptState::Submitted).unwrap();
        assert!(a.advance(AttemptState::Failed(FailReason::PageLimit)).is_err());
        a.abandon();
        assert_eq!(a.state(), &AttemptState::Submitted);
    }

    #[test]
    fn test_pages_cannot_be_skipped() {
        let mut a = opened_form();
        let err = a.advance(AttemptState::FormPage(3)).unwrap_err();
        assert_eq!(err.from, "form-page-1");
        assert_eq!(err.to, "form-page-3");
    }

    #[test]
    fn test_recovery_bounded_per_page() {
        let mut a = opened_form();
        assert!(a.begin_recovery().unwrap());
        assert_eq!(a.page(), Some(1));
        a.advance(AttemptState::FormPage(2)).unwrap();
        assert_eq!(a.recovery_attempts(), 0);
        assert!(a.begin_recovery().unwrap());
        // Recovery state itself cannot start another recovery.
        assert!(a.begin_recovery().is_err());
    }

    #[test]
    fn test_skip_only_before_form() {
        let mut a = ApplicationAttempt::new("PM", "Acme", "u");
        a.advance(AttemptState::Opened).unwrap();
        a.advance(AttemptState::Skipped(SkipReason::ExternalSite)).unwrap();

        let mut b = opened_form();
        assert!(b.advance(AttemptState::Skipped(SkipReason::ExternalSite)).is_err());
    }

    #[test]
    fn test_abandon_marks_failed() {
        let mut a = opened_form();
        a.abandon();
        assert_eq!(a.state(), &AttemptState::Failed(FailReason::Abandoned));
    }
}
