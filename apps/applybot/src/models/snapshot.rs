use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_MAX_JOBS: u32 = 10;
const DEFAULT_SPEED: u8 = 50;
const DEFAULT_COOLDOWN_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Expected salary as the control surface writes it: a bare number or free text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SalaryInput {
    Number(f64),
    Text(String),
}

/// The configuration document exactly as stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    background_bio: String,
    #[serde(default)]
    expected_salary: Option<SalaryInput>,
    #[serde(default)]
    job_titles: Vec<String>,
    #[serde(default)]
    max_jobs: Option<u32>,
    #[serde(default)]
    blocked_companies: Vec<String>,
    #[serde(default)]
    blocked_titles: Vec<String>,
    #[serde(default)]
    scan_speed: Option<i64>,
    #[serde(default)]
    apply_speed: Option<i64>,
    #[serde(default)]
    cooldown_delay: Option<u64>,
    #[serde(default)]
    stealth_mode: bool,
    #[serde(default)]
    gpt_job_check: bool,
    #[serde(default)]
    llm_api_key: Option<String>,
    #[serde(default)]
    captcha_api_key: Option<String>,
}

/// Credentials taken from the process environment when the document has none.
#[derive(Debug, Clone, Default)]
pub struct CredentialFallbacks {
    pub llm_api_key: Option<String>,
    pub captcha_api_key: Option<String>,
}

/// Everything one run needs to know about the candidate and how to pace itself.
/// Built once per run and never mutated; a new run loads a fresh one.
#[derive(Debug, Clone)]
pub struct ConfigurationSnapshot {
    pub full_name: String,
    pub location: String,
    pub background_bio: String,
    /// Whole currency units.
    pub expected_salary: Option<u64>,
    /// Trimmed, non-empty, case-insensitively unique, in configured order.
    pub job_titles: Vec<String>,
    pub max_jobs: u32,
    /// Lowercased.
    pub blocked_companies: Vec<String>,
    /// Lowercased.
    pub blocked_titles: Vec<String>,
    pub scan_speed: u8,
    pub apply_speed: u8,
    pub cooldown_secs: u64,
    pub stealth: bool,
    pub strict_relevance_check: bool,
    pub llm_api_key: Option<String>,
    pub captcha_api_key: Option<String>,
}

impl ConfigurationSnapshot {
    pub fn load(path: &Path, fallbacks: &CredentialFallbacks) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, fallbacks)
    }

    pub fn from_json(text: &str, fallbacks: &CredentialFallbacks) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Self::from_raw(raw, fallbacks)
    }

    fn from_raw(raw: RawConfig, fallbacks: &CredentialFallbacks) -> Result<Self, ConfigError> {
        let job_titles = dedupe_titles(&raw.job_titles);
        if job_titles.is_empty() {
            return Err(ConfigError::Invalid(
                "jobTitles must contain at least one title".to_string(),
            ));
        }

        let expected_salary = match raw.expected_salary {
            Some(SalaryInput::Number(n)) if n >= 0.0 => Some(n.round() as u64),
            Some(SalaryInput::Number(n)) => {
                return Err(ConfigError::Invalid(format!(
                    "expectedSalary must not be negative, got {n}"
                )))
            }
            Some(SalaryInput::Text(t)) if t.trim().is_empty() => None,
            Some(SalaryInput::Text(t)) => Some(parse_salary(&t).ok_or_else(|| {
                ConfigError::Invalid(format!("expectedSalary '{t}' is not a number"))
            })?),
            None => None,
        };

        Ok(Self {
            full_name: raw.full_name.trim().to_string(),
            location: raw.location.trim().to_string(),
            background_bio: raw.background_bio.trim().to_string(),
            expected_salary,
            job_titles,
            max_jobs: raw.max_jobs.unwrap_or(DEFAULT_MAX_JOBS),
            blocked_companies: lowercase_entries(&raw.blocked_companies),
            blocked_titles: lowercase_entries(&raw.blocked_titles),
            scan_speed: speed("scanSpeed", raw.scan_speed)?,
            apply_speed: speed("applySpeed", raw.apply_speed)?,
            cooldown_secs: raw.cooldown_delay.unwrap_or(DEFAULT_COOLDOWN_SECS),
            stealth: raw.stealth_mode,
            strict_relevance_check: raw.gpt_job_check,
            llm_api_key: non_blank(raw.llm_api_key).or_else(|| non_blank(fallbacks.llm_api_key.clone())),
            captcha_api_key: non_blank(raw.captcha_api_key)
                .or_else(|| non_blank(fallbacks.captcha_api_key.clone())),
        })
    }

    pub fn has_llm(&self) -> bool {
        self.llm_api_key.is_some()
    }

    pub fn has_captcha_solver(&self) -> bool {
        self.captcha_api_key.is_some()
    }

    /// Salary digits as typed into a form field, e.g. "120000".
    pub fn salary_text(&self) -> Option<String> {
        self.expected_salary.map(|s| s.to_string())
    }

    pub fn primary_title(&self) -> &str {
        self.job_titles.first().map(String::as_str).unwrap_or_default()
    }
}

fn speed(key: &str, value: Option<i64>) -> Result<u8, ConfigError> {
    match value {
        None => Ok(DEFAULT_SPEED),
        Some(v) if (1..=100).contains(&v) => Ok(v as u8),
        Some(v) => Err(ConfigError::Invalid(format!(
            "{key} must be between 1 and 100, got {v}"
        ))),
    }
}

fn dedupe_titles(titles: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    titles
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn lowercase_entries(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Reads "$120,000", "120k" or "95000.50" as whole units. Only the first figure counts.
pub fn parse_salary(text: &str) -> Option<u64> {
    let re = regex_lite::Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?)\s*([kK])?").ok()?;
    let caps = re.captures(text)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let number = if caps.get(2).is_some() {
        number * 1000.0
    } else {
        number
    };
    Some(number.round() as u64)
}
