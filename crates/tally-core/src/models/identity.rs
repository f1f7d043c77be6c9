//! Identity and credential types

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Minimum accepted password length at sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authenticated user context; all data is scoped to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Tokens issued by the identity service for a signed-in identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub identity: Identity,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Presence check used before signing in
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(Error::Validation("Email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("Password is required".to_string()));
        }
        Ok(())
    }

    /// Sign-up policy: at least six characters with both letters and digits
    pub fn validate_for_sign_up(&self) -> Result<()> {
        self.validate()?;

        let has_letter = self.password.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = self.password.chars().any(|c| c.is_ascii_digit());

        if self.password.chars().count() < MIN_PASSWORD_LEN || !has_letter || !has_digit {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters and contain both letters and numbers",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}
