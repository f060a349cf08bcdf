mod browser;
mod captcha;
mod config;
mod control;
mod documents;
mod engine;
mod errors;
mod llm_client;
mod matching;
mod models;
mod records;
mod site;
mod state;
mod throttle;

use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::browser::webdriver::{SessionOptions, WebDriverBrowser};
use crate::captcha::{ChallengeSolver, TwoCaptchaSolver};
use crate::config::Settings;
use crate::control::file::FileControlChannel;
use crate::engine::Engine;
use crate::llm_client::{CompletionService, LlmClient};
use crate::models::snapshot::ConfigurationSnapshot;
use crate::records::JsonlRecordSink;
use crate::state::{Collaborators, EngineState};
use crate::throttle::Throttle;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("applybot: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings)?;
    info!(
        "Starting applybot v{} against {:?}",
        env!("CARGO_PKG_VERSION"),
        settings.site
    );

    let snapshot =
        ConfigurationSnapshot::load(&settings.config_path, &settings.credential_fallbacks())
            .with_context(|| format!("Loading {}", settings.config_path.display()))?;
    info!(
        titles = snapshot.job_titles.len(),
        max_jobs = snapshot.max_jobs,
        stealth = snapshot.stealth,
        strict_check = snapshot.strict_relevance_check,
        llm = snapshot.has_llm(),
        captcha_solver = snapshot.has_captcha_solver(),
        "Configuration loaded"
    );

    let control = Arc::new(FileControlChannel::new(&settings.control_path));
    spawn_interrupt_handler(control.clone());

    let llm: Option<Arc<dyn CompletionService>> = match &snapshot.llm_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone()).context("Building language-model client")?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(client))
        }
        None => {
            warn!("No language-model key; generated answers are disabled");
            None
        }
    };
    let solver: Option<Arc<dyn ChallengeSolver>> = match &snapshot.captcha_api_key {
        Some(key) => Some(Arc::new(
            TwoCaptchaSolver::new(key.clone()).context("Building challenge solver")?,
        )),
        None => None,
    };

    let throttle = Throttle::from_snapshot(&snapshot);
    let options = SessionOptions {
        headless: settings.headless,
        profile_dir: settings.profile_dir.clone(),
        implicit_wait: throttle.implicit_wait(),
        page_load: throttle.page_load_timeout(),
    };
    let browser = Arc::new(
        WebDriverBrowser::connect(&settings.webdriver_url, &options)
            .await
            .with_context(|| format!("Connecting to WebDriver at {}", settings.webdriver_url))?,
    );

    let services = Collaborators {
        browser: browser.clone(),
        control,
        sink: Arc::new(JsonlRecordSink::new(&settings.records_path)),
        llm,
        solver,
    };
    let state = match EngineState::new(snapshot, settings.site.profile(), services) {
        Ok(state) => state.with_login_timeout(Duration::from_secs(settings.login_timeout_secs)),
        Err(e) => {
            browser.quit().await;
            return Err(e.into());
        }
    };

    let outcome = Engine::new(state).run().await;
    browser.quit().await;
    let summary = outcome?;
    info!(
        submitted = summary.submitted,
        skipped = summary.skipped,
        failed = summary.failed,
        stopped = summary.stopped,
        "Done"
    );
    Ok(())
}

/// Console output plus the plain-text activity stream.
fn init_tracing(settings: &Settings) -> Result<()> {
    let activity = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.activity_log)
        .with_context(|| format!("Opening activity log {}", settings.activity_log.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &settings.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(activity)),
        )
        .init();
    Ok(())
}

/// Ctrl-C becomes an ordinary stop request so the engine unwinds the usual way.
fn spawn_interrupt_handler(control: Arc<FileControlChannel>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Interrupt received, requesting stop");
        if let Err(e) = control.request_stop().await {
            warn!("Could not write stop request to {}: {}", control.path().display(), e);
        }
    });
}
