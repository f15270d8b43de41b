//! Domain models for the storefront.
//!
//! These are the validated types handlers and services work with. Database row
//! structs live next to their queries in [`crate::db`] and convert into these.

pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{
    Category, CategoryInput, Product, ProductInput, ProductPatch, ProductUpdate, ValidProduct,
};
pub use order::{AdminOrder, NewOrder, Order, OrderCustomer, OrderLine, OrderWithLines};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
