//! Outbound email transports.
//!
//! * [`LogMailer`] writes messages to the log instead of sending them. Use it for local development.
//! * [`ResendMailer`] delivers through the Resend HTTP API.
//!
//! Transports classify failures as [`EmailError::Transient`] (worth retrying) or [`EmailError::Permanent`].
use std::sync::Arc;

use futures_util::future::BoxFuture;
use log::*;
use mof_common::Secret;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    StatusCode,
};
use serde::Serialize;
use thiserror::Error;

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("Temporary email delivery failure. {0}")]
    Transient(String),
    #[error("Email delivery failed. {0}")]
    Permanent(String),
}

impl EmailError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EmailError::Transient(_))
    }
}

/// Sends a single email. Implementations must be usable from any task.
#[cfg_attr(test, mockall::automock)]
pub trait EmailSender: Send + Sync {
    fn send_email(&self, message: EmailMessage) -> BoxFuture<'static, Result<(), EmailError>>;
}

impl<T: EmailSender + ?Sized> EmailSender for Arc<T> {
    fn send_email(&self, message: EmailMessage) -> BoxFuture<'static, Result<(), EmailError>> {
        (**self).send_email(message)
    }
}

//----------------------------------------------   LogMailer  ----------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl EmailSender for LogMailer {
    fn send_email(&self, message: EmailMessage) -> BoxFuture<'static, Result<(), EmailError>> {
        info!(
            "✉️ From: {}\n   To: {}\n   Subject: {}\n\n{}",
            message.from,
            message.to.join(", "),
            message.subject,
            message.body
        );
        Box::pin(async { Ok(()) })
    }
}

//----------------------------------------------  ResendMailer  ----------------------------------------------------
#[derive(Clone)]
pub struct ResendMailer {
    client: Arc<Client>,
    url: String,
}

#[derive(Serialize)]
struct ResendEmail {
    from: String,
    to: Vec<String>,
    subject: String,
    text: String,
}

impl From<EmailMessage> for ResendEmail {
    fn from(msg: EmailMessage) -> Self {
        Self { from: msg.from, to: msg.to, subject: msg.subject, text: msg.body }
    }
}

impl ResendMailer {
    pub fn new(api_key: &Secret<String>) -> Result<Self, EmailError> {
        Self::with_url(api_key, RESEND_API_URL)
    }

    pub fn with_url(api_key: &Secret<String>, url: &str) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.reveal()))
            .map_err(|e| EmailError::Permanent(format!("Invalid Resend API key. {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| EmailError::Permanent(format!("Could not create HTTP client. {e}")))?;
        Ok(Self { client: Arc::new(client), url: url.to_string() })
    }
}

/// Rate limiting and server-side errors are worth another attempt. Any other rejection is final.
fn classify_status(status: StatusCode, message: String) -> EmailError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        EmailError::Transient(format!("Resend responded with {status}. {message}"))
    } else {
        EmailError::Permanent(format!("Resend responded with {status}. {message}"))
    }
}

impl EmailSender for ResendMailer {
    fn send_email(&self, message: EmailMessage) -> BoxFuture<'static, Result<(), EmailError>> {
        let client = Arc::clone(&self.client);
        let url = self.url.clone();
        Box::pin(async move {
            let recipients = message.to.join(", ");
            let body = ResendEmail::from(message);
            trace!("✉️ Sending email to {recipients} via Resend");
            let response = client
                .post(url)
                .json(&body)
                .send()
                .await
                .map_err(|e| EmailError::Transient(format!("Could not reach Resend. {e}")))?;
            let status = response.status();
            if status.is_success() {
                debug!("✉️ Resend accepted email to {recipients}");
                Ok(())
            } else {
                let message = response.text().await.unwrap_or_default();
                Err(classify_status(status, message))
            }
        })
    }
}
