use shared::{
    domain::{ContactKind, Language, Submission},
    error::ValidationError,
};

pub const MAX_NAME_CHARS: usize = 200;
pub const MAX_CONTACT_CHARS: usize = 200;

/// A submission whose required fields are present, trimmed, and whose optional
/// fields are `None` when blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub name: String,
    pub contact: String,
    pub contact_kind: ContactKind,
    pub service: Option<String>,
    pub message: Option<String>,
    pub language: Language,
}

pub fn validate(submission: &Submission) -> Result<ValidSubmission, ValidationError> {
    let name = submission.name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong {
            max: MAX_NAME_CHARS,
        });
    }
    let contact = submission.contact.trim();
    if contact.is_empty() {
        return Err(ValidationError::MissingContact);
    }
    if contact.chars().count() > MAX_CONTACT_CHARS {
        return Err(ValidationError::ContactTooLong {
            max: MAX_CONTACT_CHARS,
        });
    }

    Ok(ValidSubmission {
        name: name.to_string(),
        contact: contact.to_string(),
        contact_kind: ContactKind::classify(contact),
        service: non_blank(submission.service.as_deref()),
        message: non_blank(submission.message.as_deref()),
        language: submission.language,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
