use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::error::DomainError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Plain-text password that is only ever handed to the identity provider.
///
/// It has no `Serialize` impl and its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    // length is checked in ensure_valid
    pub password: Password,

    #[validate(custom(function = "non_blank", message = "First name is required"))]
    pub first_name: String,

    #[validate(custom(function = "non_blank", message = "Last name is required"))]
    pub last_name: String,

    #[serde(default)]
    pub role: Option<String>,
}

impl RegistrationRequest {
    /// Checks the field constraints and flattens any failures into one message.
    pub fn ensure_valid(&self) -> Result<(), DomainError> {
        let mut messages = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => describe(&errors),
        };
        if self.password.expose().chars().count() < MIN_PASSWORD_LENGTH {
            messages.push(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            ));
        }
        if messages.is_empty() {
            return Ok(());
        }
        messages.sort();
        Err(DomainError::InvalidRequest(messages.join("; ")))
    }

    /// Explicitly requested role; blank counts as none.
    pub fn requested_role(&self) -> Option<&str> {
        self.role
            .as_deref()
            .map(str::trim)
            .filter(|role| !role.is_empty())
    }

    /// Requested role, or `default` when none (or an empty one) was given.
    pub fn role_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.requested_role().unwrap_or(default)
    }
}

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn describe(errors: &ValidationErrors) -> Vec<String> {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect()
}
