//! Supplier workflows: inventory, received orders, dashboard stats.
//!
//! Every operation requires a signed-in session whose profile carries the
//! supplier role; the guard runs before any network call. The stats and
//! filter helpers are pure so dashboards can recompute them locally.

use thiserror::Error;
use tracing::instrument;
use vendor_connect_core::{ItemCategory, ItemId, OrderId, OrderStatus, Price, UserId, UserType};

use crate::backend::query::first_row;
use crate::backend::{BackendClient, BackendError};
use crate::session::SessionManager;
use crate::types::{Item, NewItem, Order};

const ITEMS_TABLE: &str = "items";
const ORDERS_TABLE: &str = "orders";

/// Received-orders projection with vendor contact and line items embedded.
const RECEIVED_ORDER_COLUMNS: &str = "*, user_profiles!vendor_id (name, phone), order_items (*)";

/// Errors surfaced by supplier operations.
#[derive(Debug, Error)]
pub enum SupplierError {
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// No signed-in session.
    #[error("no active session")]
    NotSignedIn,

    /// The signed-in profile is not a supplier.
    #[error("Invalid supplier account. Please check your credentials.")]
    NotASupplier,
}

/// Input for listing a new inventory item.
#[derive(Debug, Clone)]
pub struct NewItemInput {
    pub name: String,
    pub category: ItemCategory,
    pub price: Price,
    pub unit: String,
    pub description: Option<String>,
    pub stock_quantity: i64,
    pub minimum_order: i64,
}

/// Dashboard counters computed from inventory and received orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierStats {
    pub total_items: usize,
    pub pending_orders: usize,
    pub completed_orders: usize,
    /// Revenue over delivered orders only.
    pub total_revenue: Price,
}

impl SupplierStats {
    /// Compute the counters from loaded inventory and orders.
    #[must_use]
    pub fn compute(inventory: &[Item], orders: &[Order]) -> Self {
        let delivered = orders
            .iter()
            .filter(|order| order.status == OrderStatus::Delivered);

        Self {
            total_items: inventory.len(),
            pending_orders: orders
                .iter()
                .filter(|order| order.status == OrderStatus::Pending)
                .count(),
            completed_orders: delivered.clone().count(),
            total_revenue: delivered.map(|order| order.total_amount).sum(),
        }
    }
}

/// Supplier workflows bound to one session.
#[derive(Clone)]
pub struct SupplierOps {
    backend: BackendClient,
    session: SessionManager,
}

impl SupplierOps {
    /// Bind supplier workflows to a session.
    #[must_use]
    pub const fn new(backend: BackendClient, session: SessionManager) -> Self {
        Self { backend, session }
    }

    /// The signed-in supplier's user id, or why there is none.
    fn supplier_id(&self) -> Result<UserId, SupplierError> {
        let user = self
            .session
            .current_user()
            .ok_or(SupplierError::NotSignedIn)?;
        let is_supplier = self
            .session
            .current_profile()
            .is_some_and(|p| p.user_type == UserType::Supplier);
        if !is_supplier {
            return Err(SupplierError::NotASupplier);
        }
        Ok(user.id)
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// The supplier's full inventory.
    ///
    /// # Errors
    ///
    /// Returns `SupplierError::NotSignedIn`/`NotASupplier` without a
    /// supplier session, and the backend error when the query fails.
    #[instrument(skip(self))]
    pub async fn inventory(&self) -> Result<Vec<Item>, SupplierError> {
        let supplier_id = self.supplier_id()?;

        let items: Vec<Item> = self
            .backend
            .table(ITEMS_TABLE)
            .select("*")
            .eq("supplier_id", &supplier_id)
            .execute()
            .await?;
        Ok(items)
    }

    /// List a new item; it starts in stock.
    ///
    /// # Errors
    ///
    /// Returns `SupplierError::NotSignedIn`/`NotASupplier` without a
    /// supplier session, and the backend error when the insert fails.
    #[instrument(skip(self, input), fields(item = %input.name))]
    pub async fn add_item(&self, input: NewItemInput) -> Result<Item, SupplierError> {
        let supplier_id = self.supplier_id()?;

        let row = NewItem {
            supplier_id,
            name: input.name,
            category: input.category,
            price: input.price,
            unit: input.unit,
            description: input.description,
            stock_quantity: input.stock_quantity,
            minimum_order: input.minimum_order.max(1),
            in_stock: true,
        };
        let rows: Vec<Item> = self.backend.table(ITEMS_TABLE).insert(&row).await?;
        Ok(first_row(rows)?)
    }

    /// Mark an item in or out of stock.
    ///
    /// # Errors
    ///
    /// Returns `SupplierError::NotSignedIn`/`NotASupplier` without a
    /// supplier session, and the backend error when the update fails.
    #[instrument(skip(self))]
    pub async fn set_in_stock(&self, id: &ItemId, in_stock: bool) -> Result<Item, SupplierError> {
        self.supplier_id()?;

        let rows: Vec<Item> = self
            .backend
            .table(ITEMS_TABLE)
            .eq("id", id)
            .update(&serde_json::json!({ "in_stock": in_stock }))
            .await?;
        Ok(first_row(rows)?)
    }

    /// Change an item's price.
    ///
    /// # Errors
    ///
    /// Returns `SupplierError::NotSignedIn`/`NotASupplier` without a
    /// supplier session, and the backend error when the update fails.
    #[instrument(skip(self))]
    pub async fn update_price(&self, id: &ItemId, price: Price) -> Result<Item, SupplierError> {
        self.supplier_id()?;

        let rows: Vec<Item> = self
            .backend
            .table(ITEMS_TABLE)
            .eq("id", id)
            .update(&serde_json::json!({ "price": price }))
            .await?;
        Ok(first_row(rows)?)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Orders placed with this supplier, with vendor contact and line items.
    ///
    /// # Errors
    ///
    /// Returns `SupplierError::NotSignedIn`/`NotASupplier` without a
    /// supplier session, and the backend error when the query fails.
    #[instrument(skip(self))]
    pub async fn received_orders(&self) -> Result<Vec<Order>, SupplierError> {
        let supplier_id = self.supplier_id()?;

        let orders: Vec<Order> = self
            .backend
            .table(ORDERS_TABLE)
            .select(RECEIVED_ORDER_COLUMNS)
            .eq("supplier_id", &supplier_id)
            .execute()
            .await?;
        Ok(orders)
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `SupplierError::NotSignedIn`/`NotASupplier` without a
    /// supplier session, and the backend error when the update fails.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, SupplierError> {
        self.supplier_id()?;

        let rows: Vec<Order> = self
            .backend
            .table(ORDERS_TABLE)
            .eq("id", id)
            .update(&serde_json::json!({ "status": status }))
            .await?;
        Ok(first_row(rows)?)
    }
}

// =============================================================================
// Pure dashboard helpers
// =============================================================================

/// Filter inventory by a case-insensitive search term and/or category.
///
/// The search term matches item names and descriptions; an empty term
/// matches everything.
#[must_use]
pub fn filter_inventory<'a>(
    items: &'a [Item],
    search: &str,
    category: Option<ItemCategory>,
) -> Vec<&'a Item> {
    let search = search.to_lowercase();

    items
        .iter()
        .filter(|item| {
            search.is_empty()
                || item.name.to_lowercase().contains(&search)
                || item
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&search))
        })
        .filter(|item| category.is_none_or(|c| item.category == c))
        .collect()
}

/// Filter orders by status; `None` matches everything.
#[must_use]
pub fn filter_orders<'a>(orders: &'a [Order], status: Option<OrderStatus>) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|order| status.is_none_or(|s| order.status == s))
        .collect()
}
