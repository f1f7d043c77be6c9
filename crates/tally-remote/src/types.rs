//! Hosted API payloads

use serde::{Deserialize, Serialize};
use tally_core::models::{AuthSession, Identity};

#[derive(Debug, Clone, Serialize)]
pub struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response of the password and refresh grants, and of sign-up when no
/// confirmation is needed
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: ApiUser,
}

/// Sign-up answers with a session or, when confirmation is pending, a bare user
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<ApiUser>,
}

/// Error body; the service uses different field names per endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<ApiUser> for Identity {
    fn from(user: ApiUser) -> Self {
        Identity {
            id: user.id,
            email: user.email,
        }
    }
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        AuthSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            identity: token.user.into(),
        }
    }
}

impl ApiErrorBody {
    /// First populated message field
    pub fn message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_precedence() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("Invalid login credentials"));

        let body: ApiErrorBody = serde_json::from_str(r#"{"msg":"User already registered"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("User already registered"));
    }

    #[test]
    fn test_pending_confirmation_signup() {
        let body: SignUpResponse =
            serde_json::from_str(r#"{"id":"u1","email":"me@example.com"}"#).unwrap();
        assert!(body.access_token.is_none());
        assert!(body.user.is_none());
    }
}
