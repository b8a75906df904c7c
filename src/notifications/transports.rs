// Notification transports
//
// Email: Resend
// Customer messaging: Twilio Content API (WhatsApp/SMS templates)

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::error::{AppError, AppResult};

/// A pre-approved message template and its positional variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub fields: Vec<String>,
}

impl MessageTemplate {
    /// Twilio expects variables keyed "1", "2", ... as a JSON object string
    pub fn content_variables(&self) -> String {
        let vars: BTreeMap<String, &str> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), v.as_str()))
            .collect();
        serde_json::to_string(&vars).unwrap_or_else(|_| "{}".to_string())
    }
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Returns the provider's message id
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> AppResult<String>;
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_message(&self, to: &str, template: &MessageTemplate) -> AppResult<String>;
}

/// Turns a provider reply into its parsed body, or an error carrying the
/// provider's own text when the status is not 2xx.
async fn provider_reply<T: DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(AppError::ExternalError(format!(
            "{} API error ({}): {}",
            provider, status, error_text
        )));
    }
    Ok(response.json().await?)
}

// ============ EMAIL (RESEND) ============

pub struct ResendEmailClient {
    api_key: String,
    from_email: String,
    client: reqwest::Client,
}

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

impl ResendEmailClient {
    pub fn new(api_key: String, from_email: String) -> Self {
        Self {
            api_key,
            from_email,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmailTransport for ResendEmailClient {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> AppResult<String> {
        let response = self
            .client
            .post(RESEND_EMAILS_URL)
            .bearer_auth(&self.api_key)
            .json(&ResendEmailRequest {
                from: &self.from_email,
                to: [to],
                subject,
                html: html_body,
            })
            .send()
            .await?;

        let sent: ResendEmailResponse = provider_reply("Resend", response).await?;
        info!(to, email_id = %sent.id, "📧 Email sent via Resend");
        Ok(sent.id)
    }
}

// ============ MESSAGING (TWILIO) ============

pub struct TwilioMessageClient {
    account_sid: String,
    auth_token: String,
    from_number: String,
    content_sid: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

impl TwilioMessageClient {
    pub fn new(
        account_sid: String,
        auth_token: String,
        from_number: String,
        content_sid: String,
    ) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            content_sid,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MessageTransport for TwilioMessageClient {
    async fn send_message(&self, to: &str, template: &MessageTemplate) -> AppResult<String> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let variables = template.content_variables();

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", self.from_number.as_str()),
                ("To", to),
                ("ContentSid", self.content_sid.as_str()),
                ("ContentVariables", variables.as_str()),
            ])
            .send()
            .await?;

        let sent: TwilioMessageResponse = provider_reply("Twilio", response).await?;
        info!(to, message_sid = %sent.sid, "📱 Message sent via Twilio");
        Ok(sent.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resend_client_creation() {
        let client = ResendEmailClient::new("test_key".to_string(), "noreply@example.com".to_string());
        assert_eq!(client.from_email, "noreply@example.com");
    }

    #[test]
    fn test_twilio_client_creation() {
        let client = TwilioMessageClient::new(
            "AC123456".to_string(),
            "token123".to_string(),
            "whatsapp:+1234567890".to_string(),
            "HX0001".to_string(),
        );
        assert_eq!(client.from_number, "whatsapp:+1234567890");
        assert_eq!(client.content_sid, "HX0001");
    }

    #[test]
    fn test_resend_body_lists_recipient() {
        let body = serde_json::to_value(ResendEmailRequest {
            from: "noreply@example.com",
            to: ["ops@example.com"],
            subject: "Payment received",
            html: "<p>ok</p>",
        })
        .unwrap();
        assert_eq!(body["to"], serde_json::json!(["ops@example.com"]));
        assert_eq!(body["from"], "noreply@example.com");
    }

    #[test]
    fn test_content_variables_are_numbered_from_one() {
        let template = MessageTemplate {
            fields: vec!["Amina".into(), "600.00".into()],
        };
        assert_eq!(template.content_variables(), r#"{"1":"Amina","2":"600.00"}"#);
    }
}
