use std::sync::Arc;

use anyhow::Context;
use relay::{telegram::TelegramProvider, RelayContext};

use crate::config::Settings;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) relay: RelayContext,
}

impl AppState {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let provider = TelegramProvider::new(&settings.telegram_api_base, settings.telegram_timeout())
            .context("failed to set up telegram provider")?;
        Ok(Self {
            relay: RelayContext {
                provider: Arc::new(provider),
                bot_token: settings.telegram_bot_token.clone(),
                chat_id: settings.telegram_chat_id.clone(),
                notification: settings.notification_settings()?,
            },
        })
    }
}
