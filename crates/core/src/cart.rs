//! Client-side cart.
//!
//! The cart is a list of `{product snapshot, quantity}` lines with two derived
//! fields, `item_count` and `total`, recomputed after every change.
//!
//! [`Cart`] is an immutable snapshot; [`Cart::apply`] is a pure reducer that
//! returns the next snapshot for a [`CartAction`]. [`CartStore`] wraps the
//! reducer for UI bindings: it owns the current snapshot and writes the items
//! to a [`CartStorage`] under [`CART_STORAGE_KEY`] after every dispatch.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::OrderRequest;
use crate::types::ProductId;

/// Storage key the serialized cart items live under.
pub const CART_STORAGE_KEY: &str = "cart";

/// Product fields copied into the cart when the item is added.
///
/// The price is a snapshot: the server re-prices every line at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// One cart line.
///
/// Serialized flat (`{id, name, price, ..., quantity}`), which is the shape
/// persisted to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: ProductSnapshot,
    pub quantity: u32,
}

impl CartItem {
    /// `price × quantity`, or `None` if it does not fit in a `Decimal`.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.product.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// A state transition on the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Replace all items (hydration from storage).
    Load { items: Vec<CartItem> },
    /// Add units of a product, merging with an existing line.
    Add {
        product: ProductSnapshot,
        quantity: u32,
    },
    /// Drop a product's line.
    Remove { product_id: ProductId },
    /// Replace a line's quantity; zero or negative removes the line.
    SetQuantity { product_id: ProductId, quantity: i64 },
    /// Empty the cart.
    Clear,
}

/// Immutable cart snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
    items: Vec<CartItem>,
    item_count: u64,
    total: Decimal,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from items, computing the derived fields.
    ///
    /// Returns `None` if the total does not fit in a `Decimal`.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Option<Self> {
        let total = items.iter().try_fold(Decimal::ZERO, |sum, item| {
            item.line_total().and_then(|line| sum.checked_add(line))
        })?;
        let item_count = items.iter().map(|item| u64::from(item.quantity)).sum();
        Some(Self {
            items,
            item_count,
            total,
        })
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Σ quantity over all lines.
    #[must_use]
    pub const fn item_count(&self) -> u64 {
        self.item_count
    }

    /// Σ (price × quantity) over all lines.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity of a product currently in the cart (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.product.id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Compute the next snapshot for `action`. `self` is left untouched.
    ///
    /// An action whose result would overflow the total is ignored.
    #[must_use]
    pub fn apply(&self, action: CartAction) -> Self {
        let items = match action {
            CartAction::Load { items } => items,
            CartAction::Add { quantity: 0, .. } => self.items.clone(),
            CartAction::Add { product, quantity } => {
                let mut items = self.items.clone();
                match items.iter_mut().find(|item| item.product.id == product.id) {
                    Some(existing) => {
                        existing.quantity = existing.quantity.saturating_add(quantity);
                    }
                    None => items.push(CartItem { product, quantity }),
                }
                items
            }
            CartAction::Remove { product_id } => self.without(product_id),
            CartAction::SetQuantity {
                product_id,
                quantity,
            } => {
                if quantity <= 0 {
                    self.without(product_id)
                } else {
                    let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                    self.with_quantity(product_id, quantity)
                }
            }
            CartAction::Clear => Vec::new(),
        };

        Self::from_items(items).unwrap_or_else(|| {
            tracing::warn!("Cart total out of range; action ignored");
            self.clone()
        })
    }

    /// Turn the cart into an order request for checkout.
    #[must_use]
    pub fn to_order_request(&self) -> OrderRequest {
        OrderRequest::new(
            self.items
                .iter()
                .map(|item| (item.product.id, i64::from(item.quantity))),
        )
    }

    fn without(&self, product_id: ProductId) -> Vec<CartItem> {
        self.items
            .iter()
            .filter(|item| item.product.id != product_id)
            .cloned()
            .collect()
    }

    fn with_quantity(&self, product_id: ProductId, quantity: u32) -> Vec<CartItem> {
        self.items
            .iter()
            .map(|item| {
                if item.product.id == product_id {
                    CartItem {
                        product: item.product.clone(),
                        quantity,
                    }
                } else {
                    item.clone()
                }
            })
            .collect()
    }
}

// =============================================================================
// Persistence
// =============================================================================

/// Errors from reading or writing the cart blob.
#[derive(Debug, Error)]
pub enum CartStorageError {
    /// Backend I/O failed.
    #[error("cart storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob could not be (de)serialized.
    #[error("cart serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key/value store the cart is persisted to.
pub trait CartStorage {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CartStorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CartStorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CartStorageError`] if the backend cannot be written.
    fn set(&mut self, key: &str, value: String) -> Result<(), CartStorageError>;
}

/// In-process storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CartStorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CartStorageError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Cart state container: current snapshot plus write-through persistence.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    cart: Cart,
}

impl<S: CartStorage> CartStore<S> {
    /// Hydrate the cart from storage.
    ///
    /// A missing blob yields an empty cart. An unreadable or corrupt blob is
    /// logged and also yields an empty cart, as does one whose total overflows.
    pub fn load(storage: S) -> Self {
        let cart = match read_items(&storage) {
            Ok(items) => Cart::from_items(items).unwrap_or_else(|| {
                tracing::warn!("Stored cart total out of range; starting empty");
                Cart::new()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Could not load cart from storage");
                Cart::new()
            }
        };

        Self { storage, cart }
    }

    /// Current snapshot.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Apply `action` and persist the resulting items.
    ///
    /// The in-memory snapshot is updated even when persistence fails.
    ///
    /// # Errors
    ///
    /// Returns [`CartStorageError`] if the items could not be written.
    pub fn dispatch(&mut self, action: CartAction) -> Result<&Cart, CartStorageError> {
        self.cart = self.cart.apply(action);

        let blob = serde_json::to_string(self.cart.items())?;
        self.storage.set(CART_STORAGE_KEY, blob)?;

        Ok(&self.cart)
    }

    /// Add units of a product.
    ///
    /// # Errors
    ///
    /// See [`CartStore::dispatch`].
    pub fn add(
        &mut self,
        product: ProductSnapshot,
        quantity: u32,
    ) -> Result<&Cart, CartStorageError> {
        self.dispatch(CartAction::Add { product, quantity })
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// See [`CartStore::dispatch`].
    pub fn remove(&mut self, product_id: ProductId) -> Result<&Cart, CartStorageError> {
        self.dispatch(CartAction::Remove { product_id })
    }

    /// Set a line's quantity (≤ 0 removes).
    ///
    /// # Errors
    ///
    /// See [`CartStore::dispatch`].
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<&Cart, CartStorageError> {
        self.dispatch(CartAction::SetQuantity {
            product_id,
            quantity,
        })
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// See [`CartStore::dispatch`].
    pub fn clear(&mut self) -> Result<&Cart, CartStorageError> {
        self.dispatch(CartAction::Clear)
    }

    /// Give back the storage backend.
    pub fn into_storage(self) -> S {
        self.storage
    }
}

fn read_items<S: CartStorage>(storage: &S) -> Result<Vec<CartItem>, CartStorageError> {
    match storage.get(CART_STORAGE_KEY)? {
        Some(blob) => Ok(serde_json::from_str(&blob)?),
        None => Ok(Vec::new()),
    }
}
