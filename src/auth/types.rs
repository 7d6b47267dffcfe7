// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Credential payload posted to the token endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialData {
    /// Username (or email) and password
    Password { username: String, password: String },

    /// Token obtained from a social provider
    Provider {
        provider_id: String,
        access_token: String,
    },

    /// Any other flat set of fields the backend understands
    Custom(Map<String, Value>),
}

impl CredentialData {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        CredentialData::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn provider(provider_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        CredentialData::Provider {
            provider_id: provider_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Object handed to the form encoder
    pub fn to_form_value(&self) -> Value {
        match self {
            CredentialData::Password { username, password } => serde_json::json!({
                "username": username,
                "password": password,
            }),
            CredentialData::Provider {
                provider_id,
                access_token,
            } => serde_json::json!({
                "providerId": provider_id,
                "accessToken": access_token,
            }),
            CredentialData::Custom(fields) => Value::Object(fields.clone()),
        }
    }

    /// Short description safe for logs
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialData::Password { .. } => "password",
            CredentialData::Provider { .. } => "provider",
            CredentialData::Custom(_) => "custom",
        }
    }
}

/// OAuth-style body some backends return from the token endpoint
///
/// Backends that only set the access token cookie return no body; callers
/// that need the token parse it from the authentication response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Expiry computed relative to `issued_at`
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.expires_in?).ok()?;
        issued_at.checked_add_signed(Duration::try_seconds(secs)?)
    }
}
