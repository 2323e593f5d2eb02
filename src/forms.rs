//! Submitted form input and its validation rules.

use std::collections::BTreeMap;

use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors};

/// First error message per field, keyed by field name
pub type FieldErrors = BTreeMap<String, String>;

/// Question title and body as entered
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct QuestionInput {
    #[validate(length(
        min = 5,
        max = 255,
        message = "The title must be between 5 and 255 characters."
    ))]
    pub title: String,
    #[validate(length(min = 5, message = "The body must be at least 5 characters."))]
    pub body: String,
}

impl QuestionInput {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            body: body.trim().to_string(),
        }
    }

    pub fn check(&self) -> Result<(), FieldErrors> {
        check(self, &[("title", &self.title), ("body", &self.body)])
    }
}

/// Answer body as entered
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct AnswerInput {
    #[validate(length(min = 5, message = "Your answer must be at least 5 characters."))]
    pub body: String,
}

impl AnswerInput {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.trim().to_string(),
        }
    }

    pub fn check(&self) -> Result<(), FieldErrors> {
        check(self, &[("body", &self.body)])
    }
}

/// Sign-up details
#[derive(Debug, Clone, Validate)]
pub struct RegisterInput {
    #[validate(
        length(min = 2, max = 32, message = "The username must be between 2 and 32 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    pub password: String,
    #[validate(must_match(
        other = "password",
        message = "The password confirmation does not match."
    ))]
    pub password_confirmation: String,
}

impl RegisterInput {
    pub fn new(username: &str, email: &str, password: &str, password_confirmation: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password: password.to_string(),
            password_confirmation: password_confirmation.to_string(),
        }
    }

    pub fn check(&self) -> Result<(), FieldErrors> {
        check(
            self,
            &[
                ("username", &self.username),
                ("email", &self.email),
                ("password", &self.password),
            ],
        )
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(
            "The username may only contain letters, numbers, dashes, and underscores.".into(),
        ))
    }
}

/// Run the derived rules; empty required fields get a "required" message instead.
fn check<T: Validate>(input: &T, required: &[(&str, &str)]) -> Result<(), FieldErrors> {
    let mut errors = match input.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => collect_errors(&e),
    };

    for (field, value) in required {
        if value.is_empty() {
            errors.insert(field.to_string(), format!("The {} field is required.", field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        if let Some(first) = errs.first() {
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("The {} field is invalid.", field));
            fields.insert(field.to_string(), message);
        }
    }
    fields
}
