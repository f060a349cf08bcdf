use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::models::snapshot::CredentialFallbacks;
use crate::site::Site;

/// Process settings: where things live and how the browser is driven.
/// Candidate profile and pacing come from the configuration document instead.
#[derive(Debug, Clone, Parser)]
#[command(name = "applybot", version, about = "Automated job application engine")]
pub struct Settings {
    /// Job board to run against.
    #[arg(long, value_enum, env = "APPLYBOT_SITE", default_value = "seek")]
    pub site: Site,

    /// Configuration document written by the control surface.
    #[arg(long = "config", env = "CONFIG_PATH", default_value = "config.json")]
    pub config_path: PathBuf,

    /// Pause/stop/alternate-mode flags.
    #[arg(long = "control", env = "CONTROL_PATH", default_value = "control.json")]
    pub control_path: PathBuf,

    /// Append-only log of confirmed submissions.
    #[arg(long = "records", env = "RECORDS_PATH", default_value = "applications.jsonl")]
    pub records_path: PathBuf,

    /// Plain-text activity stream for the log viewer.
    #[arg(long = "activity-log", env = "ACTIVITY_LOG", default_value = "activity.log")]
    pub activity_log: PathBuf,

    #[arg(long = "webdriver", env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    #[arg(long, env = "RUN_HEADLESS")]
    pub headless: bool,

    /// Chrome user-data-dir so the site session survives restarts.
    #[arg(long = "profile-dir", env = "BROWSER_PROFILE_DIR")]
    pub profile_dir: Option<PathBuf>,

    /// How long to wait for a manual sign-in.
    #[arg(long, env = "LOGIN_TIMEOUT_SECS", default_value_t = 300)]
    pub login_timeout_secs: u64,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub rust_log: String,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "CAPTCHA_API_KEY", hide_env_values = true)]
    pub captcha_api_key: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        let settings = Self::try_parse().context("Invalid command line or environment")?;
        if settings.login_timeout_secs == 0 {
            anyhow::bail!("--login-timeout-secs must be greater than zero");
        }
        Ok(settings)
    }

    /// Environment credentials, used only where the configuration document has none.
    pub fn credential_fallbacks(&self) -> CredentialFallbacks {
        CredentialFallbacks {
            llm_api_key: non_blank(&self.anthropic_api_key),
            captcha_api_key: non_blank(&self.captcha_api_key),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
