//! Query descriptor for the backend's REST data store.
//!
//! A [`TableQuery`] is an immutable description of one request against one
//! table: builder calls consume the descriptor and return a new one, and the
//! terminal verbs take it by value. Re-executing a query therefore requires
//! an explicit `clone()` - there is no shared clause state to replay.
//!
//! Clauses translate directly into the store's query-string syntax:
//! `select(columns)` appends `select=<columns>` and `eq(column, value)`
//! appends `<column>=eq.<value>`, joined by `&` in call order. Values are
//! embedded verbatim - callers must only pass trusted identifiers.

use core::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{BackendClient, BackendError, check_status};

/// An immutable query against one named table.
#[derive(Clone)]
pub struct TableQuery {
    client: BackendClient,
    table: String,
    clauses: Vec<String>,
}

impl fmt::Debug for TableQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableQuery")
            .field("table", &self.table)
            .field("clauses", &self.clauses)
            .finish_non_exhaustive()
    }
}

impl TableQuery {
    pub(crate) fn new(client: BackendClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_owned(),
            clauses: Vec::new(),
        }
    }

    /// Project the given columns, e.g. `"*"` or an embedded-resource list.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.clauses.push(format!("select={columns}"));
        self
    }

    /// Filter rows where `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.clauses.push(format!("{column}=eq.{value}"));
        self
    }

    /// The accumulated query string, clauses joined in call order.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.clauses.join("&")
    }

    fn url(&self) -> String {
        self.client.rest_endpoint(&self.table, &self.query_string())
    }

    /// Attach `apikey` and, when a session is stored, the bearer token.
    ///
    /// The token is read at call time: a token refreshed mid-chain is
    /// honored, and a cleared token downgrades the call to anonymous.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("apikey", self.client.api_key());
        match self.client.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =========================================================================
    // Terminal verbs
    // =========================================================================

    /// Fetch matching rows (GET).
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` on a non-2xx response and
    /// `BackendError::Http` on transport or decode failures.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn execute<T: DeserializeOwned>(self) -> Result<T, BackendError> {
        let url = self.url();
        debug!(%url, "fetching rows");

        let request = self.authorize(self.client.http().get(&url));
        let response = check_status(request.send().await?).await?;

        Ok(response.json().await?)
    }

    /// Insert a record (POST), returning the created rows.
    ///
    /// Sends `Prefer: return=representation` so the store echoes the rows
    /// it wrote.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` on a non-2xx response and
    /// `BackendError::Http` on transport or decode failures.
    #[instrument(skip(self, record), fields(table = %self.table))]
    pub async fn insert<T: DeserializeOwned>(
        self,
        record: &impl Serialize,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.url();
        debug!(%url, "inserting row");

        let request = self
            .authorize(self.client.http().post(&url))
            .header("Prefer", "return=representation")
            .json(record);
        let response = check_status(request.send().await?).await?;

        Ok(response.json().await?)
    }

    /// Apply a partial update to matching rows (PATCH), returning them.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` on a non-2xx response and
    /// `BackendError::Http` on transport or decode failures.
    #[instrument(skip(self, changes), fields(table = %self.table))]
    pub async fn update<T: DeserializeOwned>(
        self,
        changes: &impl Serialize,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.url();
        debug!(%url, "updating rows");

        let request = self
            .authorize(self.client.http().patch(&url))
            .header("Prefer", "return=representation")
            .json(changes);
        let response = check_status(request.send().await?).await?;

        Ok(response.json().await?)
    }

    /// Delete matching rows (DELETE).
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` on a non-2xx response and
    /// `BackendError::Http` on transport failures.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn delete(self) -> Result<(), BackendError> {
        let url = self.url();
        debug!(%url, "deleting rows");

        let request = self.authorize(self.client.http().delete(&url));
        check_status(request.send().await?).await?;

        Ok(())
    }
}

/// Unwrap the first row of a `return=representation` response.
pub(crate) fn first_row<T>(rows: Vec<T>) -> Result<T, BackendError> {
    rows.into_iter().next().ok_or(BackendError::NoReturnedRows)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use url::Url;

    use super::super::TokenStore;
    use super::*;
    use crate::config::BackendConfig;

    fn test_client() -> BackendClient {
        let config = BackendConfig {
            base_url: Url::parse("https://backend.test").unwrap(),
            api_key: SecretString::from("anon-key"),
        };
        BackendClient::new(&config, TokenStore::new())
    }

    #[test]
    fn test_query_string_order_preserving() {
        let query = test_client()
            .table("items")
            .select("*")
            .eq("supplier_id", "S1");

        assert_eq!(query.query_string(), "select=*&supplier_id=eq.S1");
    }

    #[test]
    fn test_query_string_no_escaping() {
        let query = test_client()
            .table("items")
            .select("*, user_profiles!supplier_id (name, business_name)")
            .eq("in_stock", true);

        assert_eq!(
            query.query_string(),
            "select=*, user_profiles!supplier_id (name, business_name)&in_stock=eq.true"
        );
    }

    #[test]
    fn test_empty_query_string() {
        let query = test_client().table("items");
        assert_eq!(query.query_string(), "");
    }

    #[test]
    fn test_builder_returns_new_descriptor_per_call() {
        let base = test_client().table("orders").select("*");
        let narrowed = base.clone().eq("vendor_id", "v1");

        // The original descriptor is unaffected by the derived one.
        assert_eq!(base.query_string(), "select=*");
        assert_eq!(narrowed.query_string(), "select=*&vendor_id=eq.v1");
    }

    #[test]
    fn test_first_row() {
        assert_eq!(first_row(vec![1, 2]).unwrap(), 1);
        assert!(matches!(
            first_row::<i32>(vec![]),
            Err(BackendError::NoReturnedRows)
        ));
    }
}
