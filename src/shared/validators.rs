use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.len() >= 6
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Validates the ticket form fields; returns every failing field so the
/// client can render them all at once.
pub fn validate_ticket_input(
    title: &str,
    name: &str,
    email: &str,
    description: &str,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if title.trim().is_empty() {
        errors.push(ValidationError {
            field: "title",
            message: "Title is required",
        });
    }
    if name.trim().is_empty() {
        errors.push(ValidationError {
            field: "name",
            message: "Name is required",
        });
    }
    if !is_valid_email(email) {
        errors.push(ValidationError {
            field: "email",
            message: "Valid email is required",
        });
    }
    if description.trim().is_empty() {
        errors.push(ValidationError {
            field: "description",
            message: "Description is required",
        });
    }
    errors
}

pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
