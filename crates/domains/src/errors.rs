//! # DomainError
//!
//! Centralized error handling for the flashcards workspace.
//! Adapters translate their own failures into these variants so that the
//! web layer can map them to HTTP outcomes in one place.

use std::fmt;

use thiserror::Error;

/// A single rejected input, keyed by the form field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// `None` for errors that concern the submission as a whole.
    pub field: Option<&'static str>,
    pub message: String,
}

/// Every problem found while validating one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: Some(field),
            message: message.into(),
        });
    }

    pub fn push_general(&mut self, message: impl Into<String>) {
        self.0.push(FieldError {
            field: None,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Messages attached to `field`.
    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == Some(field))
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Messages not attached to any field.
    pub fn general(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field.is_none())
            .map(|e| e.message.as_str())
            .collect()
    }

    /// `Ok(())` when nothing was collected, otherwise the collected errors.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for err in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            match err.field {
                Some(field) => write!(f, "{field}: {}", err.message)?,
                None => f.write_str(&err.message)?,
            }
        }
        Ok(())
    }
}

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Resource not found (e.g. Card, Tag, Category)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Rejected user input; nothing was written
    #[error("validation error: {0}")]
    Validation(ValidationErrors),

    /// No authenticated user where one is required
    #[error("authentication required")]
    Unauthorized,

    /// Authenticated, but not allowed to touch this resource
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists (e.g. duplicate username)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g. DB down, serialization)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(field, message);
        Self::Validation(errors)
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A specialized Result type for flashcards logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_display_joins_fields() {
        let mut errors = ValidationErrors::new();
        errors.push("tags", "tags must not contain spaces");
        errors.push_general("try again");
        assert_eq!(
            errors.to_string(),
            "tags: tags must not contain spaces; try again"
        );
        assert_eq!(errors.for_field("tags"), vec!["tags must not contain spaces"]);
        assert_eq!(errors.general(), vec!["try again"]);
    }

    #[test]
    fn empty_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = DomainError::not_found("card", 42);
        assert_eq!(err.to_string(), "card not found with ID 42");
    }
}
