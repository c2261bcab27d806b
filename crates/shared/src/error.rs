use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is required")]
    MissingName,
    #[error("contact is required")]
    MissingContact,
    #[error("name is longer than {max} characters")]
    NameTooLong { max: usize },
    #[error("contact is longer than {max} characters")]
    ContactTooLong { max: usize },
}
