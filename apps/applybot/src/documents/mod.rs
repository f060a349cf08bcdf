//! Document generator: cover letters, selection criteria statements and answers.
//!
//! Every method returns `None` when no model is configured or the call fails; the caller
//! leaves the field for the next layer (recovery, or a validation failure).

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm_client::CompletionService;
use crate::models::snapshot::ConfigurationSnapshot;

pub mod answers;
pub mod prompts;

use prompts::*;

/// Characters of the description given to recovery prompts.
const RECOVERY_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct CandidateProfile {
    pub full_name: String,
    pub location: String,
    pub bio: String,
    pub primary_title: Option<String>,
    pub salary: Option<String>,
}

impl CandidateProfile {
    pub fn from_snapshot(snapshot: &ConfigurationSnapshot) -> Self {
        Self {
            full_name: or_default(&snapshot.full_name, "the candidate"),
            location: or_default(&snapshot.location, "Australia"),
            bio: or_default(&snapshot.background_bio, "Experienced professional"),
            primary_title: Some(snapshot.primary_title().to_string()),
            salary: snapshot.salary_text(),
        }
    }
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// The posting a document is written for.
#[derive(Debug, Clone, Copy)]
pub struct JobContext<'a> {
    pub title: &'a str,
    pub company: &'a str,
    pub description: &'a str,
}

pub struct DocumentGenerator {
    llm: Option<Arc<dyn CompletionService>>,
    profile: CandidateProfile,
}

impl DocumentGenerator {
    pub fn new(llm: Option<Arc<dyn CompletionService>>, profile: CandidateProfile) -> Self {
        Self { llm, profile }
    }

    pub fn profile(&self) -> &CandidateProfile {
        &self.profile
    }

    pub fn available(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn cover_letter(&self, job: JobContext<'_>) -> Option<String> {
        let prompt = self.fill_job(COVER_LETTER_PROMPT_TEMPLATE, job);
        self.generate("cover letter", &prompt, COVER_LETTER_SYSTEM).await
    }

    pub async fn selection_criteria(&self, job: JobContext<'_>) -> Option<String> {
        let prompt = self.fill_job(SELECTION_CRITERIA_PROMPT_TEMPLATE, job);
        self.generate("selection criteria", &prompt, SELECTION_CRITERIA_SYSTEM)
            .await
    }

    pub async fn screening_answer(&self, job: JobContext<'_>, question: &str) -> Option<String> {
        let prompt = self
            .fill_job(SCREENING_PROMPT_TEMPLATE, job)
            .replace("{question}", question);
        self.generate("screening answer", &prompt, SCREENING_SYSTEM).await
    }

    /// Answer for a text control the form still reports as missing.
    /// `previous` holds the question/answer pairs already on the page.
    pub async fn recovery_text(
        &self,
        job: JobContext<'_>,
        question: &str,
        previous: &[(String, String)],
    ) -> Option<String> {
        let system = RECOVERY_TEXT_SYSTEM
            .replace("{full_name}", &self.profile.full_name)
            .replace("{title}", job.title)
            .replace("{company}", job.company);
        let description: String = job
            .description
            .chars()
            .take(RECOVERY_DESCRIPTION_CHARS)
            .collect();
        let description = if description.trim().is_empty() {
            "No description available".to_string()
        } else {
            description
        };
        let prompt = RECOVERY_TEXT_PROMPT_TEMPLATE
            .replace("{question}", question)
            .replace("{previous}", &format_previous(previous))
            .replace("{description}", &description)
            .replace("{bio}", &self.profile.bio)
            .replace("{location}", &self.profile.location);
        self.generate("recovery answer", &prompt, &system).await
    }

    /// Index of the option the model picks for a still-unanswered choice control.
    pub async fn recovery_choice(
        &self,
        question: &str,
        options: &[String],
        previous: &[(String, String)],
    ) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        let listed = options
            .iter()
            .map(|o| format!("- {o}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = RECOVERY_CHOICE_PROMPT_TEMPLATE
            .replace("{question}", question)
            .replace("{options}", &listed)
            .replace("{previous}", &format_previous(previous))
            .replace("{location}", &self.profile.location);
        let reply = self
            .generate("recovery choice", &prompt, RECOVERY_CHOICE_SYSTEM)
            .await?;
        match_option(&reply, options)
    }

    fn fill_job(&self, template: &str, job: JobContext<'_>) -> String {
        template
            .replace("{full_name}", &self.profile.full_name)
            .replace("{location}", &self.profile.location)
            .replace("{bio}", &self.profile.bio)
            .replace("{title}", job.title)
            .replace("{company}", job.company)
            .replace("{description}", job.description)
    }

    async fn generate(&self, what: &str, prompt: &str, system: &str) -> Option<String> {
        let llm = self.llm.as_ref()?;
        match llm.complete(prompt, system).await {
            Ok(text) => {
                debug!("Generated {} ({} chars)", what, text.len());
                Some(text)
            }
            Err(e) => {
                warn!("Could not generate {}: {}", what, e);
                None
            }
        }
    }
}

fn format_previous(previous: &[(String, String)]) -> String {
    if previous.is_empty() {
        return "(none)".to_string();
    }
    previous
        .iter()
        .map(|(q, a)| format!("- {q}: {a}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Option whose text the reply names (either containing the other), exact match first.
fn match_option(reply: &str, options: &[String]) -> Option<usize> {
    let reply = reply.trim().trim_matches(['"', '\'', '.']).to_lowercase();
    if reply.is_empty() {
        return None;
    }
    options
        .iter()
        .position(|o| o.trim().to_lowercase() == reply)
        .or_else(|| {
            options.iter().position(|o| {
                let o = o.trim().to_lowercase();
                !o.is_empty() && (reply.contains(&o) || o.contains(&reply))
            })
        })
}
