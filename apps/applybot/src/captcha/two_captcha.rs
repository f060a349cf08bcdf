use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ChallengeKind, ChallengeSolver, SolverError};

const SUBMIT_URL: &str = "https://2captcha.com/in.php";
const RESULT_URL: &str = "https://2captcha.com/res.php";
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const SOLVE_TIMEOUT: Duration = Duration::from_secs(120);
const NOT_READY: &str = "CAPCHA_NOT_READY";

#[derive(Debug, Deserialize)]
struct ServiceReply {
    status: u8,
    request: String,
}

/// 2Captcha HTTP API client.
pub struct TwoCaptchaSolver {
    client: Client,
    api_key: String,
}

impl TwoCaptchaSolver {
    pub fn new(api_key: String) -> Result<Self, SolverError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            api_key,
        })
    }

    async fn submit(
        &self,
        kind: ChallengeKind,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, SolverError> {
        let (method, key_param) = match kind {
            ChallengeKind::Recaptcha => ("userrecaptcha", "googlekey"),
            ChallengeKind::Turnstile => ("turnstile", "sitekey"),
        };
        let reply: ServiceReply = self
            .client
            .post(SUBMIT_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("method", method),
                (key_param, site_key),
                ("pageurl", page_url),
                ("json", "1"),
            ])
            .send()
            .await?
            .json()
            .await?;
        if reply.status != 1 {
            return Err(SolverError::Service(reply.request));
        }
        Ok(reply.request)
    }

    async fn poll(&self, id: &str) -> Result<String, SolverError> {
        let deadline = tokio::time::Instant::now() + SOLVE_TIMEOUT;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let reply: ServiceReply = self
                .client
                .get(RESULT_URL)
                .query(&[
                    ("key", self.api_key.as_str()),
                    ("action", "get"),
                    ("id", id),
                    ("json", "1"),
                ])
                .send()
                .await?
                .json()
                .await?;
            match (reply.status, reply.request.as_str()) {
                (1, _) => return Ok(reply.request),
                (_, NOT_READY) => debug!("Challenge {} not solved yet", id),
                _ => return Err(SolverError::Service(reply.request)),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SolverError::Timeout(SOLVE_TIMEOUT.as_secs()));
            }
        }
    }
}

#[async_trait]
impl ChallengeSolver for TwoCaptchaSolver {
    async fn solve(
        &self,
        kind: ChallengeKind,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, SolverError> {
        info!("Sending {} to solving service", kind);
        let id = self.submit(kind, site_key, page_url).await?;
        self.poll(&id).await
    }
}
