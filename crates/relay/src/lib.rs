use std::sync::Arc;

use chrono::Utc;
use shared::{domain::Submission, error::ValidationError};
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub mod notification;
pub mod provider;
pub mod telegram;
pub mod validation;

use notification::{render_notification, NotificationSettings};
use provider::{Destination, MessagingProvider};
use validation::validate;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("submission rejected: {0}")]
    ValidationFailed(#[from] ValidationError),
    #[error("relay destination is not configured: missing {0}")]
    ConfigurationMissing(&'static str),
    #[error("provider rejected the notification: {description}")]
    ProviderRejected { description: String },
    #[error("provider unreachable: {0}")]
    Transport(String),
}

impl RelayError {
    /// Only validation failures are the caller's fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }
}

/// Everything a relay call needs. Shared read-only across concurrent requests.
#[derive(Clone)]
pub struct RelayContext {
    pub provider: Arc<dyn MessagingProvider>,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub notification: NotificationSettings,
}

impl RelayContext {
    pub fn destination(&self) -> Result<Destination, RelayError> {
        Destination::from_parts(self.bot_token.as_deref(), self.chat_id.as_deref())
    }
}

/// Validates `submission` and forwards it to the provider in a single attempt.
///
/// Validation and configuration are checked before any network call. There is
/// no retry and no deduplication; a repeated submit produces a repeated
/// notification.
pub async fn relay(ctx: &RelayContext, submission: &Submission) -> Result<(), RelayError> {
    let request_id = Uuid::new_v4();
    deliver(ctx, submission)
        .instrument(info_span!("relay", %request_id))
        .await
}

async fn deliver(ctx: &RelayContext, submission: &Submission) -> Result<(), RelayError> {
    let submission = validate(submission).map_err(|error| {
        warn!(%error, "submission failed validation");
        RelayError::from(error)
    })?;

    let destination = ctx.destination().map_err(|error| {
        error!(
            %error,
            "relay is misconfigured; set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID"
        );
        error
    })?;

    let text = render_notification(&submission, &ctx.notification, Utc::now());
    let reply = ctx
        .provider
        .send_message(&destination, &text)
        .await
        .map_err(|error| {
            error!(%error, "provider call failed");
            RelayError::Transport(error.to_string())
        })?;

    if !reply.ok {
        let description = reply
            .description
            .unwrap_or_else(|| "no description".to_string());
        error!(%description, "provider rejected notification");
        return Err(RelayError::ProviderRejected { description });
    }

    info!(
        contact_kind = ?submission.contact_kind,
        language = submission.language.as_str(),
        "notification delivered"
    );
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
