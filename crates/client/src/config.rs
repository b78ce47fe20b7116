//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VENDOR_CONNECT_BACKEND_URL` - Base URL of the hosted backend
//! - `VENDOR_CONNECT_API_KEY` - Backend publishable (anon) API key
//! - `INGREDIENT_API_KEY` - Ingredient search API key
//!
//! ## Optional
//! - `INGREDIENT_API_URL` - Ingredient search base URL
//!   (default: <https://api.spoonacular.com>)

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default base URL for the ingredient search API.
const DEFAULT_INGREDIENT_API_URL: &str = "https://api.spoonacular.com";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Full client configuration.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Hosted backend (auth + data store) configuration.
    pub backend: BackendConfig,
    /// Ingredient search configuration.
    pub ingredients: IngredientConfig,
}

/// Hosted backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://project-ref.example.co`.
    pub base_url: Url,
    /// Publishable API key sent as the `apikey` header on every request.
    pub api_key: SecretString,
}

/// Ingredient search API configuration.
#[derive(Debug, Clone)]
pub struct IngredientConfig {
    /// Base URL of the search API.
    pub base_url: Url,
    /// API key appended to every search request.
    pub api_key: SecretString,
}

impl ConnectConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or a URL
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            backend: BackendConfig::from_env()?,
            ingredients: IngredientConfig::from_env()?,
        })
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_url("VENDOR_CONNECT_BACKEND_URL")?,
            api_key: get_required_secret("VENDOR_CONNECT_API_KEY")?,
        })
    }
}

impl IngredientConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_or_default("INGREDIENT_API_URL", DEFAULT_INGREDIENT_API_URL);
        let base_url = parse_url("INGREDIENT_API_URL", &base_url)?;

        Ok(Self {
            base_url,
            api_key: get_required_secret("INGREDIENT_API_KEY")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a required environment variable parsed as a URL.
fn get_url(key: &str) -> Result<Url, ConfigError> {
    let value = get_required_env(key)?;
    parse_url(key, &value)
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_valid() {
        let url = parse_url("TEST_URL", "https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_parse_url_invalid() {
        let err = parse_url("TEST_URL", "not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_missing_env_error_message() {
        let err = ConfigError::MissingEnvVar("VENDOR_CONNECT_API_KEY".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: VENDOR_CONNECT_API_KEY"
        );
    }
}
