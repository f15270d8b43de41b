//! Terminal cart.
//!
//! Each invocation loads the cart from its file, applies one action, and
//! writes it back. Checkout logs in, turns the cart into an order request,
//! and empties the cart once the order is placed.

use std::fmt::Write as _;
use std::path::PathBuf;

use cornershop_core::ProductId;
use cornershop_core::cart::{Cart, CartStorageError, CartStore};

use crate::api::{ApiClient, ApiError};
use crate::storage::FileStorage;

/// Errors from cart commands.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error(transparent)]
    Storage(#[from] CartStorageError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("The cart is empty")]
    Empty,
}

/// A loaded cart plus the client used to price and place it.
pub struct CartCommand {
    store: CartStore<FileStorage>,
    api: ApiClient,
}

impl CartCommand {
    /// Load the cart from `file`.
    pub fn open(file: PathBuf, api_url: &str) -> Result<Self, CartError> {
        let storage = FileStorage::new(file);
        tracing::debug!(path = %storage.path().display(), "Loading cart");
        Ok(Self {
            store: CartStore::load(storage),
            api: ApiClient::new(api_url)?,
        })
    }

    pub fn show(&self) {
        print_cart(self.store.cart());
    }

    /// Look the product up and add it with the current price.
    pub async fn add(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        let product = self.api.product(product_id).await?;
        print_cart(self.store.add(product, quantity)?);
        Ok(())
    }

    pub fn remove(&mut self, product_id: ProductId) -> Result<(), CartError> {
        print_cart(self.store.remove(product_id)?);
        Ok(())
    }

    pub fn set(&mut self, product_id: ProductId, quantity: i64) -> Result<(), CartError> {
        print_cart(self.store.set_quantity(product_id, quantity)?);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), CartError> {
        print_cart(self.store.clear()?);
        Ok(())
    }

    /// Place an order for the cart.
    ///
    /// The cart is kept when the order is rejected (for example, a product
    /// ran out of stock) so the shopper can adjust it and retry.
    pub async fn checkout(&mut self, email: &str, password: &str) -> Result<(), CartError> {
        let cart = self.store.cart();
        if cart.is_empty() {
            return Err(CartError::Empty);
        }
        let request = cart.to_order_request();

        self.api.login(email, password).await?;
        let placed = self
            .api
            .place_order(&request)
            .await
            .inspect_err(|e| {
                if let ApiError::Rejected {
                    errors: Some(errors),
                    ..
                } = e
                {
                    tracing::warn!(%errors, "Order rejected");
                }
            })?;

        self.store.clear()?;

        let total = placed
            .order
            .get("total")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("?");
        let id = placed.order.get("id").cloned().unwrap_or_default();
        tracing::info!(order_id = %id, "Order placed");
        #[allow(clippy::print_stdout)]
        {
            println!("{} (order #{id}, total {total})", placed.message);
        }
        Ok(())
    }
}

fn print_cart(cart: &Cart) {
    #[allow(clippy::print_stdout)]
    {
        print!("{}", render(cart));
    }
}

/// Text rendering of the cart, one line per item plus a summary.
fn render(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_owned();
    }

    let mut out = String::new();
    for item in cart.items() {
        let _ = writeln!(
            out,
            "#{:<6} {:<32} {:>4} x {:>9} = {:>10}",
            item.product.id.as_i64(),
            item.product.name,
            item.quantity,
            item.product.price,
            item.line_total().unwrap_or_default()
        );
    }
    let _ = writeln!(out, "{} item(s), total {}", cart.item_count(), cart.total());
    out
}

#[cfg(test)]
mod tests {
    use cornershop_core::cart::{CartAction, ProductSnapshot};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Cart::new()), "Cart is empty\n");
    }

    #[test]
    fn test_render_lines_and_summary() {
        let cart = Cart::new().apply(CartAction::Add {
            product: ProductSnapshot {
                id: ProductId::new(4),
                name: "Slim Red Polo".to_string(),
                price: Decimal::new(5_000, 2),
                image_url: None,
            },
            quantity: 2,
        });

        let text = render(&cart);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.first().is_some_and(|l| l.contains("Slim Red Polo")));
        assert!(lines.first().is_some_and(|l| l.ends_with("100.00")));
        assert_eq!(lines.last().copied(), Some("2 item(s), total 100.00"));
    }
}
