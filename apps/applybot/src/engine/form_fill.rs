//! Rule tables for answering form controls without the model.
//!
//! Everything here is a pure function of the control's question, its option labels and the
//! candidate's salary. `None` means "no rule applies"; the control is left for validation
//! recovery.

use crate::browser::form::is_placeholder_option;
use crate::browser::{ControlKind, FormControl};
use crate::matching::categories::keyword_in;
use crate::models::snapshot::parse_salary;

const WORK_RIGHTS: &[&str] = &[
    "work eligibility",
    "eligibility",
    "right to work",
    "work rights",
    "visa",
    "citizen",
    "residency",
    "legally",
    "authorised",
    "authorized",
];
const RESIDENT_OPTIONS: &[&str] = &[
    "australian",
    "citizen",
    "permanent resident",
    "unlimited",
    "pr",
];
const LICENCE: &[&str] = &["driver", "licence", "license"];
const RELOCATION: &[&str] = &["relocat", "move"];
const SALARY: &[&str] = &["salary", "pay", "remuneration", "compensation", "expectation"];
const EXPERIENCE: &[&str] = &["experience", "familiar", "knowledge", "proficien"];
const POLICE: &[&str] = &["police", "background check", "criminal"];
const LOCATION: &[&str] = &["based", "located", "travel", "commute", "onsite", "on-site"];
const YES_NO: &[&str] = &[
    "do you", "have you", "were you", "are you", "can you", "did you", "will you", "worked",
    "responsible", "willing",
];
/// Options the default rule steers away from.
const NEGATIVE: &[&str] = &["no", "not", "none", "visa", "sponsor", "require", "never"];
const SENIOR: &[&str] = &["more", "5+", "senior", "5"];
const NONE_OF_THESE: &str = "none of these";

const COVER_LETTER_HINTS: &[&str] = &["cover"];
const CRITERIA_HINTS: &[&str] = &["selection criteria", "key selection", "addressing the criteria"];
const DOCUMENT_QUESTIONS: &[&str] = &["resume", "résumé", "cv", "cover letter", "document"];
const DOCUMENT_OPTIONS: &[&str] = &["select", "use", "write", "existing", "include", "upload"];
const DOCUMENT_NEGATIVE: &[&str] = &["don't", "do not", "without", "no cover", "skip"];
/// Shorter questions are usually stray labels, not questions.
const MIN_QUESTION_CHARS: usize = 5;

fn any_in(keywords: &[&str], haystack: &str) -> bool {
    keywords.iter().any(|k| keyword_in(k, haystack))
}

fn lower(options: &[String]) -> Vec<String> {
    options.iter().map(|o| o.trim().to_lowercase()).collect()
}

fn position_of(options: &[String], keywords: &[&str]) -> Option<usize> {
    options.iter().position(|o| any_in(keywords, o))
}

fn yes_option(options: &[String]) -> Option<usize> {
    position_of(options, &["yes"])
}

/// The "yes" option, but only when the group is a plain yes/no pair.
fn yes_of_pair(options: &[String]) -> Option<usize> {
    position_of(options, &["no"])?;
    yes_option(options)
}

/// Which rule answered a single-choice group. Logged, never matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceRule {
    WorkRights,
    Licence,
    Relocation,
    Salary,
    Experience,
    PoliceCheck,
    Location,
    YesNo,
    AvoidNegative,
}

/// Single-choice group (radio buttons). Rules are tried in a fixed order and the first
/// whose question keywords match decides, even when it then finds no suitable option.
pub fn radio_choice(
    question: &str,
    options: &[String],
    salary: Option<u64>,
) -> Option<(usize, ChoiceRule)> {
    if options.is_empty() {
        return None;
    }
    let q = question.to_lowercase();
    let opts = lower(options);

    if any_in(WORK_RIGHTS, &q) {
        let pick = position_of(&opts, RESIDENT_OPTIONS).or_else(|| {
            opts.iter()
                .position(|o| !any_in(&["visa", "sponsor", "require"], o))
        });
        return pick.map(|i| (i, ChoiceRule::WorkRights));
    }
    if any_in(LICENCE, &q) {
        return yes_option(&opts).map(|i| (i, ChoiceRule::Licence));
    }
    if any_in(RELOCATION, &q) {
        return position_of(&opts, &["already"])
            .or_else(|| yes_option(&opts))
            .map(|i| (i, ChoiceRule::Relocation));
    }
    if any_in(SALARY, &q) {
        let pick = salary
            .and_then(|target| nearest_salary(&opts, target))
            .unwrap_or(opts.len() - 1);
        return Some((pick, ChoiceRule::Salary));
    }
    if any_in(EXPERIENCE, &q) {
        if let Some(i) = yes_of_pair(&opts) {
            return Some((i, ChoiceRule::YesNo));
        }
        // Options run from least to most.
        return Some((opts.len() - 1, ChoiceRule::Experience));
    }
    if any_in(POLICE, &q) {
        return yes_option(&opts).map(|i| (i, ChoiceRule::PoliceCheck));
    }
    if any_in(LOCATION, &q) {
        return yes_option(&opts).map(|i| (i, ChoiceRule::Location));
    }
    if any_in(YES_NO, &q) {
        if let Some(i) = yes_option(&opts) {
            return Some((i, ChoiceRule::YesNo));
        }
    }
    opts.iter()
        .position(|o| !o.is_empty() && !any_in(NEGATIVE, o))
        .map(|i| (i, ChoiceRule::AvoidNegative))
}

/// Multi-select group: everything except a "none of these" escape option.
pub fn checkbox_choices(options: &[String]) -> Vec<usize> {
    lower(options)
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.is_empty() && !o.contains(NONE_OF_THESE))
        .map(|(i, _)| i)
        .collect()
}

/// Single-choice dropdown. Citizenship picks the citizen entry, salary the nearest figure,
/// anything else the most senior-looking option or, failing that, the last one.
pub fn select_choice(question: &str, options: &[String], salary: Option<u64>) -> Option<usize> {
    let opts = lower(options);
    let real: Vec<usize> = (0..opts.len())
        .filter(|&i| !is_placeholder_option(&opts[i]))
        .collect();
    let last = *real.last()?;
    let q = question.to_lowercase();

    if q.contains("right to work") || q.contains("best describes your right") || q.contains("citizen")
    {
        return real
            .iter()
            .copied()
            .find(|&i| opts[i].contains("australian citizen"))
            .or_else(|| real.iter().copied().find(|&i| opts[i].contains("citizen")))
            .or(Some(last));
    }
    if any_in(SALARY, &q) {
        return Some(
            salary
                .and_then(|target| nearest_salary(&opts, target))
                .unwrap_or(last),
        );
    }
    SENIOR
        .iter()
        .find_map(|k| real.iter().copied().find(|&i| opts[i].contains(k)))
        .or(Some(last))
}

/// Option whose first figure is closest to `target`. Figures under 1000 are read as
/// thousands ("80 - 100" means 80,000); placeholders and figure-less options are ignored.
pub fn nearest_salary(options: &[String], target: u64) -> Option<usize> {
    options
        .iter()
        .enumerate()
        .filter(|(_, o)| !is_placeholder_option(o))
        .filter_map(|(i, o)| {
            let figure = parse_salary(o)?;
            let figure = if figure < 1000 { figure * 1000 } else { figure };
            Some((i, figure.abs_diff(target)))
        })
        .min_by_key(|&(_, diff)| diff)
        .map(|(i, _)| i)
}

/// First-page choice about which resume/cover letter to send.
pub fn document_choice(question: &str, options: &[String]) -> Option<usize> {
    let q = question.to_lowercase();
    if !any_in(DOCUMENT_QUESTIONS, &q) {
        return None;
    }
    lower(options).iter().position(|o| {
        DOCUMENT_OPTIONS.iter().any(|k| o.contains(k))
            && !DOCUMENT_NEGATIVE.iter().any(|k| o.contains(k))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAreaKind {
    CoverLetter,
    SelectionCriteria,
    Screening,
}

/// What a free-text area is asking for. `None` for unlabelled areas.
pub fn classify_text_area(control: &FormControl) -> Option<TextAreaKind> {
    if control.kind != ControlKind::TextArea {
        return None;
    }
    let haystack = control.haystack();
    if COVER_LETTER_HINTS.iter().any(|k| haystack.contains(k)) {
        Some(TextAreaKind::CoverLetter)
    } else if CRITERIA_HINTS.iter().any(|k| haystack.contains(k)) {
        Some(TextAreaKind::SelectionCriteria)
    } else if control.question.trim().chars().count() >= MIN_QUESTION_CHARS {
        Some(TextAreaKind::Screening)
    } else {
        None
    }
}

/// Whether a text input carries a real question worth generating an answer for.
pub fn has_question(control: &FormControl) -> bool {
    control.question.trim().chars().count() >= MIN_QUESTION_CHARS
}

/// Options to select for a choice control on pages after the first.
pub fn choices_for(control: &FormControl, salary: Option<u64>) -> Vec<usize> {
    match control.kind {
        ControlKind::Radio => radio_choice(&control.question, &control.options, salary)
            .map(|(i, _)| vec![i])
            .unwrap_or_default(),
        ControlKind::Checkbox => checkbox_choices(&control.options),
        ControlKind::Select => select_choice(&control.question, &control.options, salary)
            .into_iter()
            .collect(),
        ControlKind::TextArea | ControlKind::TextInput => Vec::new(),
    }
}
