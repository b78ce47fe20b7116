//! Vendor workflows: catalog, cart, checkout, order history.
//!
//! Every operation requires a signed-in session whose profile carries the
//! vendor role; the guard runs before any network call.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, instrument};
use vendor_connect_core::{CartItemId, OrderNumber, OrderStatus, Price, UserId, UserType};

use crate::backend::query::first_row;
use crate::backend::{BackendClient, BackendError};
use crate::ingredients::Ingredient;
use crate::session::SessionManager;
use crate::types::{CartItem, Item, NewCartItem, NewOrder, NewOrderItem, Order, OrderItem};

const ITEMS_TABLE: &str = "items";
const CART_TABLE: &str = "cart_items";
const ORDERS_TABLE: &str = "orders";
const ORDER_ITEMS_TABLE: &str = "order_items";

/// Catalog projection with the supplier contact embedded.
const CATALOG_COLUMNS: &str = "*, user_profiles!supplier_id (name, business_name)";
/// Order-history projection with line items embedded.
const ORDER_COLUMNS: &str = "*, order_items (*)";

/// Errors surfaced by vendor operations.
#[derive(Debug, Error)]
pub enum VendorError {
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// No signed-in session.
    #[error("no active session")]
    NotSignedIn,

    /// The signed-in profile is not a vendor.
    #[error("Invalid vendor account. Please check your credentials.")]
    NotAVendor,

    /// Checkout was attempted with an empty cart.
    #[error("Your cart is empty")]
    EmptyCart,
}

/// Vendor workflows bound to one session.
#[derive(Clone)]
pub struct VendorOps {
    backend: BackendClient,
    session: SessionManager,
}

impl VendorOps {
    /// Bind vendor workflows to a session.
    #[must_use]
    pub const fn new(backend: BackendClient, session: SessionManager) -> Self {
        Self { backend, session }
    }

    /// The signed-in vendor's user id, or why there is none.
    fn vendor_id(&self) -> Result<UserId, VendorError> {
        let user = self.session.current_user().ok_or(VendorError::NotSignedIn)?;
        let is_vendor = self
            .session
            .current_profile()
            .is_some_and(|p| p.user_type == UserType::Vendor);
        if !is_vendor {
            return Err(VendorError::NotAVendor);
        }
        Ok(user.id)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// All in-stock items across suppliers, with supplier contact embedded.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotSignedIn`/`NotAVendor` without a vendor
    /// session, and the backend error when the query fails.
    #[instrument(skip(self))]
    pub async fn browse_catalog(&self) -> Result<Vec<Item>, VendorError> {
        self.vendor_id()?;

        let items: Vec<Item> = self
            .backend
            .table(ITEMS_TABLE)
            .select(CATALOG_COLUMNS)
            .eq("in_stock", true)
            .execute()
            .await?;
        Ok(items)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The vendor's current cart rows.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotSignedIn`/`NotAVendor` without a vendor
    /// session, and the backend error when the query fails.
    #[instrument(skip(self))]
    pub async fn load_cart(&self) -> Result<Vec<CartItem>, VendorError> {
        let vendor_id = self.vendor_id()?;

        let items: Vec<CartItem> = self
            .backend
            .table(CART_TABLE)
            .select("*")
            .eq("vendor_id", &vendor_id)
            .execute()
            .await?;
        Ok(items)
    }

    /// Add a catalog item to the cart at the given quantity.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotSignedIn`/`NotAVendor` without a vendor
    /// session, and the backend error when the insert fails.
    #[instrument(skip(self, item), fields(item = %item.name))]
    pub async fn add_to_cart(
        &self,
        item: &Item,
        quantity: Decimal,
    ) -> Result<CartItem, VendorError> {
        let vendor_id = self.vendor_id()?;

        let row = NewCartItem::from_catalog_item(vendor_id, item, quantity);
        let rows: Vec<CartItem> = self.backend.table(CART_TABLE).insert(&row).await?;
        Ok(first_row(rows)?)
    }

    /// Add searched ingredients to the cart, one row per ingredient.
    ///
    /// Ingredient rows carry no price (a matching supplier item sets one
    /// later) and remember the dish they came from. Inserts run
    /// sequentially; a failure leaves earlier rows in the cart.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotSignedIn`/`NotAVendor` without a vendor
    /// session, and the backend error when an insert fails.
    #[instrument(skip(self, ingredients), fields(dish = %dish, count = ingredients.len()))]
    pub async fn add_ingredients_to_cart(
        &self,
        dish: &str,
        ingredients: &[Ingredient],
    ) -> Result<Vec<CartItem>, VendorError> {
        let vendor_id = self.vendor_id()?;

        let mut added = Vec::with_capacity(ingredients.len());
        for ingredient in ingredients {
            let row = NewCartItem {
                vendor_id: vendor_id.clone(),
                supplier_id: None,
                item_id: None,
                item_name: ingredient.name.clone(),
                quantity: ingredient.amount,
                price: Price::ZERO,
                unit: Some(ingredient.unit.clone()),
                from_ingredients: true,
                dish_name: Some(dish.to_owned()),
            };
            let rows: Vec<CartItem> = self.backend.table(CART_TABLE).insert(&row).await?;
            added.push(first_row(rows)?);
        }
        Ok(added)
    }

    /// Remove one cart row.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotSignedIn`/`NotAVendor` without a vendor
    /// session, and the backend error when the delete fails.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, id: &CartItemId) -> Result<(), VendorError> {
        self.vendor_id()?;

        self.backend
            .table(CART_TABLE)
            .eq("id", id)
            .delete()
            .await?;
        Ok(())
    }

    /// Remove every cart row belonging to the vendor.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotSignedIn`/`NotAVendor` without a vendor
    /// session, and the backend error when the delete fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), VendorError> {
        let vendor_id = self.vendor_id()?;

        self.backend
            .table(CART_TABLE)
            .eq("vendor_id", &vendor_id)
            .delete()
            .await?;
        Ok(())
    }

    /// Sum of line totals across cart rows.
    #[must_use]
    pub fn cart_total(items: &[CartItem]) -> Price {
        items.iter().map(CartItem::line_total).sum()
    }

    // =========================================================================
    // Checkout and orders
    // =========================================================================

    /// Place one order per supplier represented in the cart.
    ///
    /// Cart rows are grouped by supplier (rows without a supplier form their
    /// own group with no supplier id). For each group, sequentially: insert
    /// the order with the client-computed total, then one order-item insert
    /// per row. The cart is cleared after all groups commit.
    ///
    /// Commits are best-effort: if a later group's insert fails, earlier
    /// orders remain placed remotely and the cart is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::EmptyCart` before any network call when the
    /// cart has no rows, `VendorError::NotSignedIn`/`NotAVendor` without a
    /// vendor session, and the backend error when an insert fails.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<Vec<Order>, VendorError> {
        let vendor_id = self.vendor_id()?;

        let cart = self.load_cart().await?;
        if cart.is_empty() {
            return Err(VendorError::EmptyCart);
        }

        let groups = group_by_supplier(cart);
        debug!(groups = groups.len(), "placing orders per supplier");

        let mut placed = Vec::with_capacity(groups.len());
        for (supplier_id, items) in groups {
            let total: Price = items.iter().map(CartItem::line_total).sum();

            let rows: Vec<Order> = self
                .backend
                .table(ORDERS_TABLE)
                .insert(&NewOrder {
                    vendor_id: vendor_id.clone(),
                    supplier_id,
                    order_number: OrderNumber::generate(),
                    total_amount: total,
                    status: OrderStatus::Pending,
                })
                .await?;
            let order = first_row(rows)?;

            for item in &items {
                let line = NewOrderItem::from_cart_item(order.id.clone(), item);
                let _created: Vec<OrderItem> =
                    self.backend.table(ORDER_ITEMS_TABLE).insert(&line).await?;
            }

            placed.push(order);
        }

        self.backend
            .table(CART_TABLE)
            .eq("vendor_id", &vendor_id)
            .delete()
            .await?;

        Ok(placed)
    }

    /// The vendor's order history with line items embedded.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::NotSignedIn`/`NotAVendor` without a vendor
    /// session, and the backend error when the query fails.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<Order>, VendorError> {
        let vendor_id = self.vendor_id()?;

        let orders: Vec<Order> = self
            .backend
            .table(ORDERS_TABLE)
            .select(ORDER_COLUMNS)
            .eq("vendor_id", &vendor_id)
            .execute()
            .await?;
        Ok(orders)
    }
}

/// Group cart rows by supplier, preserving first-seen supplier order.
fn group_by_supplier(items: Vec<CartItem>) -> Vec<(Option<UserId>, Vec<CartItem>)> {
    let mut groups: Vec<(Option<UserId>, Vec<CartItem>)> = Vec::new();

    for item in items {
        let key = item.supplier_id.clone();
        if let Some((_, group)) = groups.iter_mut().find(|(existing, _)| *existing == key) {
            group.push(item);
        } else {
            groups.push((key, vec![item]));
        }
    }

    groups
}
