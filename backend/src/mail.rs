//! Transactional email, sent through a serverless function that proxies the
//! hosted email API. The function accepts the API's send payload and relays
//! the upstream status code and error body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{auth::Role, config::MailConfig};

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("Email service is rate limited, try again shortly")]
    RateLimited,

    #[error("Email service rejected the API key")]
    Unauthorized,

    #[error("Recipient address is not verified for this sender: {0}")]
    UnverifiedRecipient(String),

    #[error("Sender domain is not verified: {0}")]
    DomainNotVerified(String),

    #[error("Email function endpoint not found")]
    EndpointNotFound,

    #[error("Email service returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Email request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl MailError {
    /// Classify a non-2xx response from the function.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<UpstreamError>(body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| body.trim().to_string());
        let lowered = message.to_ascii_lowercase();

        match status {
            StatusCode::NOT_FOUND => MailError::EndpointNotFound,
            StatusCode::TOO_MANY_REQUESTS => MailError::RateLimited,
            StatusCode::UNAUTHORIZED => MailError::Unauthorized,
            // The sandbox message also tells you to verify a domain, so match it first.
            StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY
                if lowered.contains("testing emails") || lowered.contains("recipient") =>
            {
                MailError::UnverifiedRecipient(message)
            }
            StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY
                if lowered.contains("domain") =>
            {
                MailError::DomainNotVerified(message)
            }
            StatusCode::FORBIDDEN => MailError::Unauthorized,
            _ => MailError::Upstream {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[derive(Deserialize)]
struct UpstreamError {
    message: Option<String>,
    error: Option<String>,
}

/// Everything the invitation email needs to say.
#[derive(Debug, Clone)]
pub struct InviteEmail {
    pub to: String,
    pub organization_name: String,
    pub inviter_name: String,
    pub role: Role,
    pub accept_url: String,
    pub expires_at: OffsetDateTime,
}

impl InviteEmail {
    pub fn subject(&self) -> String {
        format!("You're invited to join {} on Timecard", self.organization_name)
    }

    pub fn text(&self) -> String {
        format!(
            "{inviter} invited you to join {org} as {article} {role}.\n\n\
             Accept the invitation: {url}\n\n\
             This invitation expires on {expires}.",
            inviter = self.inviter_name,
            org = self.organization_name,
            article = if self.role == Role::Manager { "a" } else { "an" },
            role = self.role,
            url = self.accept_url,
            expires = self.expires_at.date(),
        )
    }

    pub fn html(&self) -> String {
        format!(
            "<p><strong>{inviter}</strong> invited you to join <strong>{org}</strong> as {role}.</p>\
             <p><a href=\"{url}\">Accept invitation</a></p>\
             <p>This invitation expires on {expires}.</p>",
            inviter = escape_html(&self.inviter_name),
            org = escape_html(&self.organization_name),
            role = self.role,
            url = escape_html(&self.accept_url),
            expires = self.expires_at.date(),
        )
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
pub trait InviteMailer: Send + Sync {
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), MailError>;

    /// Sends a test message to the sender address itself.
    async fn test_configuration(&self) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    html: String,
    text: String,
}

pub struct HttpMailer {
    client: Client,
    function_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let client = Client::builder()
            .user_agent("timecard-backend")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            function_url: config.function_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }

    /// Bare address part of `from`, e.g. `noreply@x.io` from `Name <noreply@x.io>`.
    fn sender_address(&self) -> &str {
        match (self.from.find('<'), self.from.rfind('>')) {
            (Some(start), Some(end)) if start < end => &self.from[start + 1..end],
            _ => self.from.as_str(),
        }
    }

    async fn post(&self, payload: &SendEmail<'_>) -> Result<(), MailError> {
        let mut req = self.client.post(&self.function_url).json(payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(());
        }

        let body = match res.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(status = status.as_u16(), error = %e, "Could not read email function error body");
                String::new()
            }
        };
        let err = MailError::from_response(status, &body);
        tracing::warn!(status = status.as_u16(), error = %err, "Email function rejected request");
        Err(err)
    }
}

#[async_trait]
impl InviteMailer for HttpMailer {
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), MailError> {
        let payload = SendEmail {
            from: &self.from,
            to: vec![email.to.as_str()],
            subject: email.subject(),
            html: email.html(),
            text: email.text(),
        };
        self.post(&payload).await?;
        tracing::info!(to = %email.to, "Invitation email sent");
        Ok(())
    }

    async fn test_configuration(&self) -> Result<(), MailError> {
        let payload = SendEmail {
            from: &self.from,
            to: vec![self.sender_address()],
            subject: "Timecard email configuration test".into(),
            html: "<p>Email delivery is configured correctly.</p>".into(),
            text: "Email delivery is configured correctly.".into(),
        };
        self.post(&payload).await
    }
}
