//! Dish-to-ingredients search client.
//!
//! Queries the recipe search API for a dish name and maps the first
//! matching recipe's ingredient list into [`Ingredient`] records a vendor
//! can drop into the cart. The API is consumed as an opaque JSON surface;
//! only the fields the marketplace needs are kept.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::IngredientConfig;

/// Unit recorded when the recipe API does not name one.
const DEFAULT_UNIT: &str = "piece";

/// Errors that can occur when searching for ingredients.
#[derive(Debug, Error)]
pub enum IngredientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// Numeric HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        message: String,
    },
}

/// One ingredient of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    /// The recipe API's ingredient id.
    pub id: i64,
    pub name: String,
    /// Suggested amount; defaults to 1 when the API omits it.
    pub amount: Decimal,
    /// Measurement unit; defaults to `"piece"` when the API omits it.
    pub unit: String,
    /// Image file name on the API's CDN, when available.
    pub image: Option<String>,
}

/// Client for the recipe search API.
#[derive(Clone)]
pub struct IngredientClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl IngredientClient {
    /// Create a new ingredient search client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &IngredientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Look up the ingredients of the closest recipe for a dish name.
    ///
    /// Returns an empty list when the API finds no matching recipe.
    ///
    /// # Errors
    ///
    /// Returns `IngredientError::Api` on a non-2xx response and
    /// `IngredientError::Http` on transport or decode failures.
    #[instrument(skip(self), fields(dish = %dish))]
    pub async fn search_dish_ingredients(
        &self,
        dish: &str,
    ) -> Result<Vec<Ingredient>, IngredientError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = format!(
            "{base}/recipes/complexSearch?query={}&apiKey={}&addRecipeInformation=true&fillIngredients=true&number=1",
            urlencoding::encode(dish),
            self.api_key.expose_secret(),
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IngredientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let search: SearchResponse = response.json().await?;
        let ingredients = search
            .results
            .into_iter()
            .next()
            .map(|recipe| {
                recipe
                    .extended_ingredients
                    .into_iter()
                    .map(Ingredient::from)
                    .collect()
            })
            .unwrap_or_default();

        debug!(count = ingredients.len(), "mapped recipe ingredients");
        Ok(ingredients)
    }
}

/// Wire shape of the search response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RecipeResult>,
}

#[derive(Debug, Deserialize)]
struct RecipeResult {
    #[serde(rename = "extendedIngredients", default)]
    extended_ingredients: Vec<RawIngredient>,
}

#[derive(Debug, Deserialize)]
struct RawIngredient {
    id: i64,
    name: String,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl From<RawIngredient> for Ingredient {
    fn from(raw: RawIngredient) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            amount: raw.amount.unwrap_or(Decimal::ONE),
            unit: raw
                .unit
                .filter(|unit| !unit.is_empty())
                .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            image: raw.image,
        }
    }
}
