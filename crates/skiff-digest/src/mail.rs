//! Mail transport seam and HTTP relay implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::DigestError;

/// Information returned by a successful delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct MailDelivery {
    /// Transport-assigned message id, when the relay reports one.
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Outbound mail seam.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        bcc: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<MailDelivery, DigestError>;
}

/// Mail transport backed by an HTTP relay endpoint.
pub struct HttpMailer {
    http: Client,
    endpoint: String,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        bcc: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<MailDelivery, DigestError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({
                "from": from,
                "to": to,
                "bcc": bcc,
                "subject": subject,
                "html": html_body,
            }))
            .send()
            .await
            .map_err(|e| DigestError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::Delivery(format!("{}: {}", status, body)));
        }

        let delivery = response
            .json::<MailDelivery>()
            .await
            .unwrap_or(MailDelivery { message_id: None });
        debug!(message_id = ?delivery.message_id, "mail accepted by relay");
        Ok(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_posts_envelope_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_partial_json(json!({
                "from": "skiff@example.org",
                "to": ["team@example.org"],
                "subject": "Agenda digest",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message_id": "abc123" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(format!("{}/send", server.uri()));
        let delivery = mailer
            .send(
                "skiff@example.org",
                &["team@example.org".to_string()],
                &[],
                "Agenda digest",
                "<p>hi</p>",
            )
            .await
            .unwrap();

        assert_eq!(delivery.message_id.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn relay_rejection_is_a_delivery_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(502).set_body_string("relay down"))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(format!("{}/send", server.uri()));
        let err = mailer
            .send("a@example.org", &[], &[], "s", "<p>hi</p>")
            .await
            .unwrap_err();

        assert!(matches!(err, DigestError::Delivery(_)));
    }
}
