use chrono::{DateTime, FixedOffset, Offset, Utc};
use shared::domain::ContactKind;

use crate::validation::{ValidSubmission, MAX_CONTACT_CHARS, MAX_NAME_CHARS};

/// Telegram rejects `sendMessage` texts longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

pub const MAX_SERVICE_CHARS: usize = 200;

pub const SERVICE_PLACEHOLDER: &str = "Не указана";
pub const MESSAGE_PLACEHOLDER: &str = "Без дополнительных пожеланий";

const MOSCOW_OFFSET_SECONDS: i32 = 3 * 3600;
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y, %H:%M:%S";

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub utc_offset: FixedOffset,
    pub source_label: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            utc_offset: FixedOffset::east_opt(MOSCOW_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix()),
            source_label: "Основной сайт".into(),
        }
    }
}

/// Renders the operator notification. Only the free-text message is shortened
/// to fit the provider limit; header, name, contact, timestamp and source are
/// always present.
pub fn render_notification(
    submission: &ValidSubmission,
    settings: &NotificationSettings,
    sent_at: DateTime<Utc>,
) -> String {
    let contact_label = match submission.contact_kind {
        ContactKind::Email => "📧 Email",
        ContactKind::Phone => "📞 Телефон",
        ContactKind::Other => "📇 Контакт",
    };
    let name = truncate_chars(&submission.name, MAX_NAME_CHARS);
    let contact = truncate_chars(&submission.contact, MAX_CONTACT_CHARS);
    let service = truncate_chars(
        submission.service.as_deref().unwrap_or(SERVICE_PLACEHOLDER),
        MAX_SERVICE_CHARS,
    );
    let message = submission.message.as_deref().unwrap_or(MESSAGE_PLACEHOLDER);
    let timestamp = sent_at
        .with_timezone(&settings.utc_offset)
        .format(TIMESTAMP_FORMAT)
        .to_string();
    let source = truncate_chars(&settings.source_label, MAX_SERVICE_CHARS);

    let compose = |message: &str| {
        format!(
            "📌 Новая заявка с сайта:\n\n\
             👤 Имя: {name}\n\
             {contact_label}: {contact}\n\
             ✂️ Услуга: {service}\n\
             💬 Сообщение: {message}\n\
             🗣 Язык: {language}\n\n\
             🕒 Время: {timestamp}\n\
             🌐 Источник: {source}",
            language = submission.language.as_str(),
        )
    };

    let budget = MAX_MESSAGE_CHARS.saturating_sub(compose("").chars().count());
    compose(truncate_chars(message, budget))
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
#[path = "tests/notification_tests.rs"]
mod tests;
