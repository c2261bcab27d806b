use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::RelayError;

/// Where a notification is delivered: the bot credential plus the chat it posts into.
#[derive(Clone)]
pub struct Destination {
    bot_token: String,
    chat_id: String,
}

impl Destination {
    /// Fails closed when either half is absent or blank.
    pub fn from_parts(bot_token: Option<&str>, chat_id: Option<&str>) -> Result<Self, RelayError> {
        let bot_token = bot_token
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(RelayError::ConfigurationMissing("bot token"))?;
        let chat_id = chat_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(RelayError::ConfigurationMissing("chat id"))?;

        Ok(Self {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// The provider's verdict on a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderReply {
    pub ok: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,
    #[error("provider request failed: {0}")]
    Http(String),
    #[error("provider returned an unreadable reply (http {status}): {reason}")]
    MalformedReply { status: u16, reason: String },
    #[error("invalid provider endpoint: {0}")]
    Endpoint(String),
}

#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(
        &self,
        destination: &Destination,
        text: &str,
    ) -> Result<ProviderReply, ProviderError>;
}
