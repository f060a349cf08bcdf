//! Values typed straight into single-line fields without asking the model.

use super::CandidateProfile;
use crate::browser::{ControlKind, FormControl};

pub const NOTICE_PERIOD: &str = "2 weeks";
pub const YEARS_OF_EXPERIENCE: &str = "5";

/// Answer for a single-line text input whose question or hints identify a known field.
pub fn direct_answer(control: &FormControl, profile: &CandidateProfile) -> Option<String> {
    if control.kind != ControlKind::TextInput {
        return None;
    }
    direct_answer_for(&control.haystack(), profile)
}

/// Same rules over an arbitrary lowercased question text.
pub fn direct_answer_for(haystack: &str, profile: &CandidateProfile) -> Option<String> {
    let has = |k: &str| haystack.contains(k);
    if has("salary") || has("rate expectation") || has("expected pay") || has("remuneration") {
        return profile.salary.clone();
    }
    if has("job title") || has("jobtitle") || has("position title") {
        return profile.primary_title.clone().filter(|t| !t.is_empty());
    }
    if has("notice") && has("period") {
        return Some(NOTICE_PERIOD.to_string());
    }
    if has("years") && (has("experience") || has("how many")) {
        return Some(YEARS_OF_EXPERIENCE.to_string());
    }
    None
}
