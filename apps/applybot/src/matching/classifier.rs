use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::prompts::{RELEVANCE_PROMPT_TEMPLATE, RELEVANCE_SYSTEM};
use super::Category;
use crate::llm_client::{parse_json, CompletionService};

/// Characters of the description sent to the model.
const EXCERPT_CHARS: usize = 800;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StrictVerdict {
    pub accept: bool,
    #[serde(default)]
    pub reason: String,
}

impl StrictVerdict {
    fn fail_open(reason: impl Into<String>) -> Self {
        Self {
            accept: true,
            reason: reason.into(),
        }
    }
}

/// Second-stage relevance check over the full posting description.
///
/// Any fault calling or understanding the model accepts the posting, so an unreachable
/// model never starves the run.
pub struct StrictCheck {
    llm: Arc<dyn CompletionService>,
    targets: Vec<String>,
    related: &'static [&'static str],
}

impl StrictCheck {
    pub fn new(llm: Arc<dyn CompletionService>, targets: &[String], category: Category) -> Self {
        Self {
            llm,
            targets: targets.to_vec(),
            related: category.related_keywords(),
        }
    }

    pub async fn check(&self, title: &str, description: &str) -> StrictVerdict {
        let prompt = self.build_prompt(title, description);
        let verdict = match self.llm.complete(&prompt, RELEVANCE_SYSTEM).await {
            Ok(reply) => interpret(&reply),
            Err(e) => {
                warn!(title = %title, "Strict relevance check unavailable, accepting: {}", e);
                StrictVerdict::fail_open(format!("check unavailable: {e}"))
            }
        };
        info!(
            title = %title,
            accept = verdict.accept,
            "Strict relevance check: {}",
            verdict.reason
        );
        verdict
    }

    fn build_prompt(&self, title: &str, description: &str) -> String {
        let excerpt: String = description.chars().take(EXCERPT_CHARS).collect();
        let related = if self.related.is_empty() {
            "(none)".to_string()
        } else {
            self.related.join(", ")
        };
        RELEVANCE_PROMPT_TEMPLATE
            .replace("{targets}", &self.targets.join(", "))
            .replace("{related}", &related)
            .replace("{title}", title)
            .replace("{description}", &excerpt)
    }
}

/// JSON verdict, or a bare reply whose first word is YES/NO. Anything else accepts.
fn interpret(reply: &str) -> StrictVerdict {
    if let Ok(v) = parse_json::<StrictVerdict>(reply) {
        return v;
    }
    let trimmed = reply.trim();
    let word_len = trimmed
        .find(|c: char| !c.is_alphanumeric())
        .unwrap_or(trimmed.len());
    match trimmed[..word_len].to_uppercase().as_str() {
        "YES" => StrictVerdict {
            accept: true,
            reason: after_keyword(trimmed, word_len),
        },
        "NO" => StrictVerdict {
            accept: false,
            reason: after_keyword(trimmed, word_len),
        },
        _ => StrictVerdict::fail_open(format!("unrecognised reply: {trimmed}")),
    }
}

fn after_keyword(reply: &str, len: usize) -> String {
    reply
        .get(len..)
        .unwrap_or_default()
        .trim_start_matches([' ', ',', '.', ':', '-'])
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_helpers::ScriptedLlm;

    fn check_with(llm: Arc<ScriptedLlm>) -> StrictCheck {
        StrictCheck::new(llm, &["Project Manager".to_string()], Category::Project)
    }

    #[tokio::test]
    async fn test_json_reject() {
        let llm = Arc::new(ScriptedLlm::replying(&[
            r#"{"accept": false, "reason": "Sales role"}"#,
        ]));
        let v = check_with(llm.clone()).check("Sales Manager", "Sell things").await;
        assert!(!v.accept);
        assert_eq!(v.reason, "Sales role");
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_fails_open() {
        let llm = Arc::new(ScriptedLlm::failing());
        let v = check_with(llm).check("Project Manager", "Deliver projects").await;
        assert!(v.accept);
    }

    #[tokio::test]
    async fn test_prompt_carries_targets_related_and_excerpt() {
        let llm = Arc::new(ScriptedLlm::replying(&["YES matches"]));
        let description = "x".repeat(2000);
        check_with(llm.clone()).check("Delivery Lead", &description).await;
        let prompt = llm.prompts().remove(0);
        assert!(prompt.contains("Project Manager"));
        assert!(prompt.contains("scrum master"));
        assert!(prompt.contains("JOB TITLE: Delivery Lead"));
        assert!(prompt.contains(&"x".repeat(800)));
        assert!(!prompt.contains(&"x".repeat(801)));
    }

    #[test]
    fn test_interpret_plain_replies() {
        assert_eq!(
            interpret("YES - strong project delivery focus"),
            StrictVerdict {
                accept: true,
                reason: "strong project delivery focus".to_string()
            }
        );
        assert!(!interpret("NO, this is a retail role").accept);
        assert!(interpret("Maybe?").accept);
        assert!(!interpret("```json\n{\"accept\": false}\n```").accept);
    }

    #[test]
    fn test_interpret_needs_a_whole_keyword() {
        assert!(interpret("NOTE: the posting is a delivery role").accept);
        assert!(interpret("Nothing conclusive").accept);
        assert!(interpret("Yesterday's posting").accept);
        assert!(!interpret("No.").accept);
        assert_eq!(interpret("no: retail").reason, "retail");
    }
}
