use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::provider::{Destination, MessagingProvider, ProviderError, ProviderReply};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Telegram Bot API client. Texts go out without a parse mode so visitor input
/// is never interpreted as markup.
#[derive(Debug, Clone)]
pub struct TelegramProvider {
    http: Client,
    api_base: Url,
}

impl TelegramProvider {
    pub fn new(api_base: &str, timeout: Duration) -> anyhow::Result<Self> {
        let api_base = Url::parse(api_base.trim())
            .with_context(|| format!("invalid telegram api base url '{api_base}'"))?;
        if api_base.cannot_be_a_base() {
            anyhow::bail!("telegram api base url '{api_base}' cannot carry a path");
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build telegram http client")?;

        Ok(Self { http, api_base })
    }

    // Tokens look like `123:abc`, so `bot123:abc` must be pushed as a segment
    // rather than joined, where it would parse as a URL scheme.
    fn send_message_url(&self, destination: &Destination) -> Result<Url, ProviderError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Endpoint("api base cannot carry a path".into()))?
            .pop_if_empty()
            .push(&format!("bot{}", destination.bot_token()))
            .push("sendMessage");
        Ok(url)
    }
}

#[async_trait]
impl MessagingProvider for TelegramProvider {
    async fn send_message(
        &self,
        destination: &Destination,
        text: &str,
    ) -> Result<ProviderReply, ProviderError> {
        let url = self.send_message_url(destination)?;
        let response = self
            .http
            .post(url)
            .json(&SendMessageRequest {
                chat_id: destination.chat_id(),
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice::<ProviderReply>(&body).map_err(|e| ProviderError::MalformedReply {
            status: status.as_u16(),
            reason: e.to_string(),
        })
    }
}

// The request URL embeds the bot token, so it is stripped before the error is surfaced.
fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        return ProviderError::Timeout;
    }
    ProviderError::Http(err.without_url().to_string())
}

#[cfg(test)]
#[path = "tests/telegram_tests.rs"]
mod tests;
