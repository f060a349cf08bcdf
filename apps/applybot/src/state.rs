use std::sync::Arc;
use std::time::Duration;

use crate::browser::Browser;
use crate::captcha::{ChallengeResolver, ChallengeSolver};
use crate::control::{ControlChannel, ControlGate};
use crate::documents::{CandidateProfile, DocumentGenerator};
use crate::errors::EngineError;
use crate::llm_client::CompletionService;
use crate::matching::classifier::StrictCheck;
use crate::matching::RelevanceFilter;
use crate::models::snapshot::ConfigurationSnapshot;
use crate::records::RecordSink;
use crate::site::SiteProfile;
use crate::throttle::stealth::Humanizer;
use crate::throttle::Throttle;

pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// External services the engine talks to. Production wires real clients; tests wire fakes.
pub struct Collaborators {
    pub browser: Arc<dyn Browser>,
    pub control: Arc<dyn ControlChannel>,
    pub sink: Arc<dyn RecordSink>,
    /// Absent when no language-model credential is configured.
    pub llm: Option<Arc<dyn CompletionService>>,
    /// Absent when no solving-service credential is configured.
    pub solver: Option<Arc<dyn ChallengeSolver>>,
}

/// Everything one run reads, built once from a snapshot and never mutated.
pub struct EngineState {
    pub snapshot: Arc<ConfigurationSnapshot>,
    pub profile: &'static SiteProfile,
    pub browser: Arc<dyn Browser>,
    pub control: ControlGate,
    pub sink: Arc<dyn RecordSink>,
    pub throttle: Throttle,
    pub humanizer: Humanizer,
    pub filter: RelevanceFilter,
    /// Second-stage check; `None` when `gptJobCheck` is off.
    pub strict: Option<StrictCheck>,
    pub documents: DocumentGenerator,
    pub challenges: ChallengeResolver,
    pub login_timeout: Duration,
}

impl EngineState {
    pub fn new(
        snapshot: ConfigurationSnapshot,
        profile: &'static SiteProfile,
        services: Collaborators,
    ) -> Result<Self, EngineError> {
        let filter = RelevanceFilter::from_snapshot(&snapshot);
        let strict = if snapshot.strict_relevance_check {
            let llm = services
                .llm
                .clone()
                .ok_or(EngineError::MissingCredential("language-model API key"))?;
            Some(StrictCheck::new(llm, &snapshot.job_titles, filter.category()))
        } else {
            None
        };
        let control = ControlGate::new(services.control);

        Ok(Self {
            profile,
            browser: services.browser,
            sink: services.sink,
            throttle: Throttle::from_snapshot(&snapshot),
            humanizer: Humanizer::new(snapshot.stealth),
            filter,
            strict,
            documents: DocumentGenerator::new(
                services.llm,
                CandidateProfile::from_snapshot(&snapshot),
            ),
            challenges: ChallengeResolver::new(services.solver, control.clone()),
            control,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            snapshot: Arc::new(snapshot),
        })
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }
}
