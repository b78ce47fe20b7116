//! Authentication protocol.
//!
//! Raw requests against the backend's `/auth/v1/*` surface: signup, the
//! password and refresh-token grants, logout, user fetch/update, and
//! password recovery. All bodies are JSON. The session facade in
//! [`crate::session`] layers state management on top; nothing here touches
//! the token store.
//!
//! The backend reports domain failures two ways: a non-2xx status, or a 2xx
//! body carrying an `error` field. Both are mapped before any typed parse.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;
use vendor_connect_core::UserType;

use super::{BackendClient, BackendError};
use crate::types::{Session, User};

/// Metadata attached to a signup request (stored on the auth user).
#[derive(Debug, Clone, Serialize)]
pub struct SignUpMetadata {
    pub name: String,
    pub user_type: UserType,
}

/// Response from the signup endpoint.
///
/// When email confirmation is required the backend returns only the user;
/// with auto-confirmation it issues tokens immediately.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResponse {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Response from a successful token grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

impl From<TokenGrant> for Session {
    fn from(grant: TokenGrant) -> Self {
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            user: grant.user,
        }
    }
}

impl BackendClient {
    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` when the backend reports a domain error
    /// (e.g. an already-registered email) and `BackendError::Status` or
    /// `BackendError::Http` on protocol failures.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up_request(
        &self,
        email: &str,
        password: &SecretString,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpResponse, BackendError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
            "data": metadata,
        });

        let response = self
            .http()
            .post(self.auth_endpoint("signup"))
            .header("apikey", self.api_key())
            .json(&body)
            .send()
            .await?;

        let body = auth_body(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` on invalid credentials and
    /// `BackendError::Status` or `BackendError::Http` on protocol failures.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn password_grant(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenGrant, BackendError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });

        let response = self
            .http()
            .post(self.auth_endpoint("token?grant_type=password"))
            .header("apikey", self.api_key())
            .json(&body)
            .send()
            .await?;

        let body = auth_body(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Exchange a refresh token for a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` when the refresh token is rejected and
    /// `BackendError::Status` or `BackendError::Http` on protocol failures.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, BackendError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });

        let response = self
            .http()
            .post(self.auth_endpoint("token?grant_type=refresh_token"))
            .header("apikey", self.api_key())
            .json(&body)
            .send()
            .await?;

        let body = auth_body(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Invalidate the session behind `token` remotely.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` or `BackendError::Http` when the
    /// backend could not be reached or rejected the call.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<(), BackendError> {
        let response = self
            .http()
            .post(self.auth_endpoint("logout"))
            .header("apikey", self.api_key())
            .bearer_auth(token)
            .send()
            .await?;

        auth_body(response).await?;
        Ok(())
    }

    /// Fetch the user behind `token`.
    ///
    /// A rejected token surfaces as `BackendError::Status`; callers treat
    /// that as a failed verification.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` on a rejected token and
    /// `BackendError::Http` on transport failures.
    #[instrument(skip(self, token))]
    pub async fn fetch_user(&self, token: &str) -> Result<User, BackendError> {
        let response = self
            .http()
            .get(self.auth_endpoint("user"))
            .header("apikey", self.api_key())
            .bearer_auth(token)
            .send()
            .await?;

        let body = auth_body(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Set a new password for the user behind `token`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` when the backend rejects the password and
    /// `BackendError::Status` or `BackendError::Http` on protocol failures.
    #[instrument(skip(self, token, new_password))]
    pub async fn update_user_password(
        &self,
        token: &str,
        new_password: &SecretString,
    ) -> Result<User, BackendError> {
        let body = serde_json::json!({ "password": new_password.expose_secret() });

        let response = self
            .http()
            .put(self.auth_endpoint("user"))
            .header("apikey", self.api_key())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let body = auth_body(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Request a password-recovery email.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` when the backend reports a domain error
    /// and `BackendError::Status` or `BackendError::Http` on protocol
    /// failures.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn recover_password(&self, email: &str) -> Result<(), BackendError> {
        let body = serde_json::json!({ "email": email });

        let response = self
            .http()
            .post(self.auth_endpoint("recover"))
            .header("apikey", self.api_key())
            .json(&body)
            .send()
            .await?;

        auth_body(response).await?;
        Ok(())
    }
}

/// Read an auth response body, surfacing domain and status errors.
async fn auth_body(response: reqwest::Response) -> Result<Value, BackendError> {
    let status = response.status();
    let text = response.text().await?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

    if let Some(message) = domain_error(&body) {
        return Err(BackendError::Api(message));
    }

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(body)
}

/// Extract the message of an `error` field, whatever its shape.
fn domain_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if error.is_null() {
        return None;
    }

    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_owned());
    }
    if let Some(description) = body.get("error_description").and_then(Value::as_str) {
        return Some(description.to_owned());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_owned());
    }
    Some(error.to_string())
}
