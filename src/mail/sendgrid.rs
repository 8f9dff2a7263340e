//! SendGrid v3 mail client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::{Email, MailError, Mailer};
use crate::config::MailConfig;

pub struct SendGridMailer {
    client: Client,
    config: MailConfig,
}

impl SendGridMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.config.from },
            "subject": email.subject,
            "content": [{ "type": "text/html", "value": email.html }],
        });

        let url = format!("{}/v3/mail/send", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("SendGrid rejected mail to {}: {} {}", email.to, status, body);
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Email sent to {}", email.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn mailer_at(api_url: &str) -> SendGridMailer {
        SendGridMailer::new(MailConfig {
            api_url: api_url.to_string(),
            api_key: "SG.key".to_string(),
            from: "noreply@nandhaengg.org".to_string(),
        })
    }

    fn email() -> Email {
        Email {
            to: "asha@nandhaengg.org".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_v3_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer SG.key"))
            .and(body_json(json!({
                "personalizations": [{ "to": [{ "email": "asha@nandhaengg.org" }] }],
                "from": { "email": "noreply@nandhaengg.org" },
                "subject": "Hello",
                "content": [{ "type": "text/html", "value": "<p>Hi</p>" }],
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&mock_server)
            .await;

        mailer_at(&mock_server.uri()).send(&email()).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&mock_server)
            .await;

        let err = mailer_at(&mock_server.uri()).send(&email()).await.unwrap_err();
        match err {
            MailError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
