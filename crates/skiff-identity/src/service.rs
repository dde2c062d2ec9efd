//! Identity-service seam and HTTP-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{ChallengeAction, ChallengeMachine, IdentityError};

/// Supplies out-of-band verification codes during the handshake.
///
/// The identity service may ask more than once; implementations must
/// be safe to call repeatedly.
pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> Result<String, IdentityError>;
}

/// Prompts the operator on the terminal for a verification code.
pub struct PromptCodeSource;

impl CodeSource for PromptCodeSource {
    fn next_code(&self) -> Result<String, IdentityError> {
        let code = rpassword::prompt_password("verification code: ")
            .map_err(|_| IdentityError::NoCode)?;
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(IdentityError::NoCode);
        }
        Ok(code)
    }
}

/// Narrow view of the external identity service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Connect to the network transport.
    async fn connect(&self) -> Result<(), IdentityError>;

    /// Whether a usable signing credential already exists.
    async fn has_credential(&self) -> Result<bool, IdentityError>;

    /// The principal name of the current credential.
    async fn identity_name(&self) -> Result<String, IdentityError>;

    /// Drive the challenge/response handshake to completion.
    ///
    /// The service owns the retry cadence; `codes` is consulted each
    /// time a verification code is required.
    async fn issue_challenge(
        &self,
        principal: &str,
        codes: &dyn CodeSource,
    ) -> Result<(), IdentityError>;
}

/// Default interval between status polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Client for the identity daemon's HTTP API.
pub struct HttpIdentityService {
    http: Client,
    base_url: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct NameResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CredentialResponse {
    present: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpIdentityService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the status poll interval (mainly for tests).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // Anything the daemon refuses outright is terminal; recoverable
        // conditions come back as status tags, not HTTP failures.
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| status.to_string());
        Err(IdentityError::Terminal(message))
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn connect(&self) -> Result<(), IdentityError> {
        let response = self.http.post(self.url("/connect")).send().await?;
        self.check(response).await?;
        debug!("connected to identity service");
        Ok(())
    }

    async fn has_credential(&self) -> Result<bool, IdentityError> {
        let response = self.http.get(self.url("/credential")).send().await?;
        let body: CredentialResponse = self.check(response).await?.json().await?;
        Ok(body.present)
    }

    async fn identity_name(&self) -> Result<String, IdentityError> {
        let response = self.http.get(self.url("/name")).send().await?;
        let body: NameResponse = self.check(response).await?.json().await?;
        Ok(body.name)
    }

    #[tracing::instrument(skip(self, codes))]
    async fn issue_challenge(
        &self,
        principal: &str,
        codes: &dyn CodeSource,
    ) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(self.url("/challenge"))
            .json(&json!({ "principal": principal }))
            .send()
            .await?;
        self.check(response).await?;

        let mut machine = ChallengeMachine::new();
        machine.challenge_issued();

        loop {
            let response = self
                .http
                .get(self.url("/status"))
                .query(&[("principal", principal)])
                .send()
                .await?;
            let body: StatusResponse = self.check(response).await?.json().await?;

            match machine.on_status(&body.status) {
                ChallengeAction::SubmitCode => {
                    let code = codes.next_code()?;
                    let response = self
                        .http
                        .post(self.url("/code"))
                        .json(&json!({ "principal": principal, "code": code }))
                        .send()
                        .await?;
                    self.check(response).await?;
                    machine.code_submitted();
                }
                ChallengeAction::Retry => {
                    // The next poll reports need-code again
                }
                ChallengeAction::Wait => {
                    sleep(self.poll_interval).await;
                }
                ChallengeAction::Done => {
                    info!(principal = %principal, "credential issued");
                    return Ok(());
                }
            }
        }
    }
}
