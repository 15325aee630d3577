// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound recovery notifications via a transactional email HTTP API.
//!
//! Every send is best-effort: callers spawn it fire-and-forget and log
//! failures. A send failure never rolls back the state transition that
//! triggered it. When the email API is not configured the mailer degrades
//! to a logged no-op, so development environments work without credentials.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

/// Default request timeout for the email API.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("email API request failed: {0}")]
    Request(String),

    #[error("email API rejected the send: HTTP {0}")]
    Rejected(u16),
}

/// Email API configuration, loaded from the environment.
#[derive(Debug, Clone)]
struct MailerConfig {
    api_url: String,
    api_key: String,
    from_address: String,
}

/// Client for the transactional email API.
///
/// Construct via [`Mailer::from_env`]; without `EMAIL_API_URL` and
/// `EMAIL_API_KEY` the mailer is disabled and every send is a no-op.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: Option<MailerConfig>,
    http: Client,
}

impl Mailer {
    /// Check whether the email API credentials are present.
    pub fn is_configured() -> bool {
        required_env_present("EMAIL_API_URL") && required_env_present("EMAIL_API_KEY")
    }

    /// Build a mailer from the environment.
    ///
    /// Missing configuration yields a disabled mailer rather than an error —
    /// notification delivery is best-effort by design.
    pub fn from_env() -> Self {
        let config = match (
            std::env::var("EMAIL_API_URL"),
            std::env::var("EMAIL_API_KEY"),
        ) {
            (Ok(api_url), Ok(api_key)) if !api_url.is_empty() && !api_key.is_empty() => {
                Some(MailerConfig {
                    api_url,
                    api_key,
                    from_address: std::env::var("EMAIL_FROM")
                        .unwrap_or_else(|_| "Legacy Locker <noreply@example.com>".to_string()),
                })
            }
            _ => None,
        };

        if config.is_none() {
            info!("Email API not configured; recovery notifications are disabled");
        }

        Self::new(config)
    }

    /// Build a disabled mailer (used by tests and development defaults).
    pub fn disabled() -> Self {
        Self::new(None)
    }

    fn new(config: Option<MailerConfig>) -> Self {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self { config, http }
    }

    /// Notify the owner that their delegate has requested vault access.
    pub async fn send_recovery_request_email(
        &self,
        owner_email: &str,
        owner_name: &str,
        delegate_name: &str,
        grace_period_days: i64,
        reason: &str,
    ) -> Result<(), MailerError> {
        let subject = format!("{delegate_name} has requested access to your Legacy Locker");
        let html = format!(
            "<p>Hi {owner_name},</p>\
             <p><strong>{delegate_name}</strong> has requested emergency access to your \
             Legacy Locker, giving this reason:</p>\
             <blockquote>{reason}</blockquote>\
             <p>If you do nothing, access will be granted automatically in \
             <strong>{grace_period_days} days</strong>. You can approve or reject the \
             request from your account at any time before then.</p>"
        );
        self.send(owner_email, &subject, &html).await
    }

    /// Notify the delegate of the owner's approve/reject decision.
    pub async fn send_recovery_decision_email(
        &self,
        delegate_email: &str,
        delegate_name: &str,
        owner_name: &str,
        approved: bool,
    ) -> Result<(), MailerError> {
        let (subject, html) = if approved {
            (
                format!("{owner_name} approved your Legacy Locker access request"),
                format!(
                    "<p>Hi {delegate_name},</p>\
                     <p>{owner_name} has <strong>approved</strong> your request. You can \
                     now access their Legacy Locker from your account.</p>"
                ),
            )
        } else {
            (
                format!("{owner_name} declined your Legacy Locker access request"),
                format!(
                    "<p>Hi {delegate_name},</p>\
                     <p>{owner_name} has <strong>declined</strong> your request. No access \
                     has been granted.</p>"
                ),
            )
        };
        self.send(delegate_email, &subject, &html).await
    }

    /// Notify the delegate that the grace period elapsed and access is ready
    /// to be claimed. The email references the locker, never key material.
    pub async fn send_delegate_access_email(
        &self,
        delegate_email: &str,
        delegate_name: &str,
        owner_name: &str,
        locker_id: &str,
    ) -> Result<(), MailerError> {
        let subject = format!("Your Legacy Locker access for {owner_name}'s vault is ready");
        let html = format!(
            "<p>Hi {delegate_name},</p>\
             <p>The response window for your access request has passed without a \
             response from {owner_name}. Sign in and confirm receipt to unlock \
             access to their Legacy Locker (reference: {locker_id}).</p>"
        );
        self.send(delegate_email, &subject, &html).await
    }

    /// POST one email to the API. No-op when unconfigured.
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailerError> {
        let Some(ref config) = self.config else {
            debug!(to, subject, "Mailer disabled; dropping notification");
            return Ok(());
        };

        let response = self
            .http
            .post(format!("{}/emails", config.api_url.trim_end_matches('/')))
            .bearer_auth(&config.api_key)
            .json(&json!({
                "from": config.from_address,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| MailerError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MailerError::Rejected(response.status().as_u16()));
        }

        debug!(to, subject, "Recovery notification sent");
        Ok(())
    }
}

fn required_env_present(name: &str) -> bool {
    std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
}
