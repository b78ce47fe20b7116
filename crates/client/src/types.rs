//! Record types for the backend's remote tables.
//!
//! Read shapes (`Item`, `Order`, ...) stay tolerant: optional fields default
//! rather than fail, since rows predate the client and carry whatever the
//! backend stored. Write shapes (`NewItem`, `NewOrder`, ...) are exact.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vendor_connect_core::{
    CartItemId, ItemCategory, ItemId, OrderId, OrderItemId, OrderNumber, OrderStatus, Price,
    UserId, UserType,
};

// =============================================================================
// Auth records
// =============================================================================

/// An authenticated backend user.
///
/// The backend owns this record; beyond the id and email everything is
/// carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Backend-issued user id.
    pub id: UserId,
    /// Sign-in email, when the backend includes it.
    #[serde(default)]
    pub email: Option<String>,
    /// Remaining fields of the backend record, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A signed-in session as persisted in the token store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token attached to authenticated requests.
    pub access_token: String,
    /// Token used to obtain a fresh access token, when issued.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// The authenticated user.
    pub user: User,
}

// =============================================================================
// Profiles
// =============================================================================

/// A user profile row (`user_profiles` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the auth user this profile belongs to.
    pub id: UserId,
    pub name: String,
    pub user_type: UserType,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub address_street: Option<String>,
    #[serde(default)]
    pub address_city: Option<String>,
    #[serde(default)]
    pub address_state: Option<String>,
    #[serde(default)]
    pub address_pincode: Option<String>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Insert shape for `user_profiles`.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: UserId,
    pub name: String,
    pub user_type: UserType,
    pub phone: Option<String>,
    pub business_name: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_pincode: Option<String>,
}

/// Partial update shape for `user_profiles`; absent fields are untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_pincode: Option<String>,
}

/// Contact fields embedded from a `user_profiles` join.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
}

// =============================================================================
// Catalog items
// =============================================================================

/// A supplier inventory row (`items` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub supplier_id: UserId,
    pub name: String,
    pub category: ItemCategory,
    pub price: Price,
    pub unit: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub minimum_order: i64,
    pub in_stock: bool,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Supplier contact embedded by the catalog query's join.
    #[serde(rename = "user_profiles", default)]
    pub supplier: Option<ContactInfo>,
}

/// Insert shape for `items`.
#[derive(Debug, Clone, Serialize)]
pub struct NewItem {
    pub supplier_id: UserId,
    pub name: String,
    pub category: ItemCategory,
    pub price: Price,
    pub unit: String,
    pub description: Option<String>,
    pub stock_quantity: i64,
    pub minimum_order: i64,
    pub in_stock: bool,
}

// =============================================================================
// Cart
// =============================================================================

/// A cart row (`cart_items` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub vendor_id: UserId,
    #[serde(default)]
    pub supplier_id: Option<UserId>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    pub item_name: String,
    pub quantity: Decimal,
    pub price: Price,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub from_ingredients: bool,
    #[serde(default)]
    pub dish_name: Option<String>,
}

impl CartItem {
    /// The line total for this cart row.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.line_total(self.quantity)
    }
}

/// Insert shape for `cart_items`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCartItem {
    pub vendor_id: UserId,
    pub supplier_id: Option<UserId>,
    pub item_id: Option<ItemId>,
    pub item_name: String,
    pub quantity: Decimal,
    pub price: Price,
    pub unit: Option<String>,
    pub from_ingredients: bool,
    pub dish_name: Option<String>,
}

impl NewCartItem {
    /// Cart row for a catalog item at the given quantity.
    #[must_use]
    pub fn from_catalog_item(vendor_id: UserId, item: &Item, quantity: Decimal) -> Self {
        Self {
            vendor_id,
            supplier_id: Some(item.supplier_id.clone()),
            item_id: Some(item.id.clone()),
            item_name: item.name.clone(),
            quantity,
            price: item.price,
            unit: Some(item.unit.clone()),
            from_ingredients: false,
            dish_name: None,
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// An order row (`orders` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub vendor_id: UserId,
    #[serde(default)]
    pub supplier_id: Option<UserId>,
    #[serde(default)]
    pub order_number: Option<OrderNumber>,
    pub total_amount: Price,
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Line items embedded by the order query's join.
    #[serde(rename = "order_items", default)]
    pub items: Vec<OrderItem>,
    /// Counterparty contact embedded by the order query's join.
    #[serde(rename = "user_profiles", default)]
    pub contact: Option<ContactInfo>,
}

/// Insert shape for `orders`.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub vendor_id: UserId,
    pub supplier_id: Option<UserId>,
    pub order_number: OrderNumber,
    pub total_amount: Price,
    pub status: OrderStatus,
}

/// An order line row (`order_items` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub item_name: String,
    pub quantity: Decimal,
    pub price: Price,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub from_ingredients: bool,
    #[serde(default)]
    pub dish_name: Option<String>,
}

/// Insert shape for `order_items`.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub item_name: String,
    pub quantity: Decimal,
    pub price: Price,
    pub unit: Option<String>,
    pub from_ingredients: bool,
    pub dish_name: Option<String>,
}

impl NewOrderItem {
    /// Order line carrying a cart row into the given order.
    #[must_use]
    pub fn from_cart_item(order_id: OrderId, item: &CartItem) -> Self {
        Self {
            order_id,
            item_name: item.item_name.clone(),
            quantity: item.quantity,
            price: item.price,
            unit: item.unit.clone(),
            from_ingredients: item.from_ingredients,
            dish_name: item.dish_name.clone(),
        }
    }
}
