//! Cornershop Core - Shared types and pure domain logic.
//!
//! This crate is used by every Cornershop component:
//! - `storefront` - JSON API server (catalog, orders, admin management)
//! - `cli` - Migrations, seeding, and the terminal cart client
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no network,
//! no database access, no HTTP clients. Anything that needs I/O is expressed as
//! a trait (see [`cart::CartStorage`]) and implemented by the caller.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, statuses, money and shop rates
//! - [`order`] - Order request normalization and the order aggregate (totals)
//! - [`cart`] - Client-side cart reducer and persisting store
//! - [`pagination`] - Page request/response shapes shared by API and clients

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod pagination;
pub mod types;

pub use types::*;
