//! Vendor Connect client library.
//!
//! Connects street-food vendors and raw-material suppliers through a hosted
//! backend providing password-grant authentication and a REST-over-HTTP data
//! store. This crate is the whole client: session management, typed CRUD
//! against the remote tables, the third-party ingredient lookup, and the
//! vendor/supplier workflows built on top.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration
//! - [`backend`] - REST backend client: token store, query builder, auth protocol
//! - [`session`] - Session/auth facade with state-change listeners
//! - [`ingredients`] - Dish-to-ingredients search client
//! - [`vendor`] - Vendor workflows: catalog, cart, checkout, orders
//! - [`supplier`] - Supplier workflows: inventory, received orders, stats
//! - [`types`] - Remote-table record types
//!
//! # Example
//!
//! ```no_run
//! use vendor_connect_client::{VendorConnect, config::ConnectConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectConfig::from_env()?;
//! let app = VendorConnect::new(&config);
//!
//! app.session().sign_in("vendor@example.com", "secret123").await?;
//! let catalog = app.vendor().browse_catalog().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod ingredients;
pub mod session;
pub mod supplier;
pub mod types;
pub mod vendor;

use backend::{BackendClient, TokenStore};
use config::ConnectConfig;
use ingredients::IngredientClient;
use session::SessionManager;
use supplier::SupplierOps;
use vendor::VendorOps;

/// Top-level handle wiring every component to one token store.
///
/// Cheaply cloneable; all clones share the same session state, so a sign-in
/// through one handle is visible to every component.
#[derive(Clone)]
pub struct VendorConnect {
    tokens: TokenStore,
    backend: BackendClient,
    session: SessionManager,
    ingredients: IngredientClient,
}

impl VendorConnect {
    /// Wire up all components from a loaded configuration.
    #[must_use]
    pub fn new(config: &ConnectConfig) -> Self {
        let tokens = TokenStore::new();
        let backend = BackendClient::new(&config.backend, tokens.clone());
        let session = SessionManager::new(backend.clone());
        let ingredients = IngredientClient::new(&config.ingredients);

        Self {
            tokens,
            backend,
            session,
            ingredients,
        }
    }

    /// The shared token store.
    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// The raw backend client.
    #[must_use]
    pub const fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// The session/auth facade.
    #[must_use]
    pub const fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The ingredient search client.
    #[must_use]
    pub const fn ingredients(&self) -> &IngredientClient {
        &self.ingredients
    }

    /// Vendor workflows bound to the current session.
    #[must_use]
    pub fn vendor(&self) -> VendorOps {
        VendorOps::new(self.backend.clone(), self.session.clone())
    }

    /// Supplier workflows bound to the current session.
    #[must_use]
    pub fn supplier(&self) -> SupplierOps {
        SupplierOps::new(self.backend.clone(), self.session.clone())
    }
}
