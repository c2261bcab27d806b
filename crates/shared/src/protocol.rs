use serde::{Deserialize, Serialize};

use crate::{
    domain::{Language, Submission},
    error::ValidationError,
};

/// Inbound JSON body of the contact form.
///
/// Older page variants post the contact value as `phone` or `email`; the
/// first non-empty of `contact`, `phone`, `email` is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl SubmissionRequest {
    pub fn language(&self) -> Language {
        Language::from_tag(self.language.as_deref())
    }

    pub fn into_submission(self) -> Submission {
        let language = self.language();
        let contact = [self.contact, self.phone, self.email]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty())
            .unwrap_or_default();

        Submission {
            name: self.name.unwrap_or_default(),
            contact,
            service: self.service,
            message: self.message,
            language,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Envelope returned to the browser for every relay outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl RelayResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
        }
    }
}

/// User-facing texts. Technical detail never goes into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Sent,
    MissingFields,
    FieldsTooLong,
    BodyTooLarge,
    DeliveryFailed,
    MethodNotAllowed,
}

impl Notice {
    pub fn text(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Sent, Language::Ru) => "Заявка отправлена!",
            (Self::Sent, Language::En) => "Your request has been sent!",
            (Self::MissingFields, Language::Ru) => "Имя и контакт обязательны",
            (Self::MissingFields, Language::En) => "Name and contact are required",
            (Self::FieldsTooLong, Language::Ru) => "Имя или контакт слишком длинные",
            (Self::FieldsTooLong, Language::En) => "Name or contact is too long",
            (Self::BodyTooLarge, Language::Ru) => "Слишком длинное сообщение",
            (Self::BodyTooLarge, Language::En) => "Your message is too long",
            (Self::DeliveryFailed, Language::Ru) => {
                "Не удалось отправить заявку. Попробуйте позже."
            }
            (Self::DeliveryFailed, Language::En) => {
                "We could not send your request. Please try again later."
            }
            (Self::MethodNotAllowed, _) => "Method not allowed",
        }
    }
}

impl From<ValidationError> for Notice {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::MissingName | ValidationError::MissingContact => Self::MissingFields,
            ValidationError::NameTooLong { .. } | ValidationError::ContactTooLong { .. } => {
                Self::FieldsTooLong
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
