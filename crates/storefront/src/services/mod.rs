//! Business logic services for the storefront.
//!
//! - `auth` - Registration, login, role changes
//! - `inventory` - Stock reservation inside a locked transaction
//! - `orders` - Place, cancel, and re-status orders
//! - `notifications` - Background "order placed" emails
//! - `email` - SMTP transport and email templates
//! - `catalog_cache` - Product listing cache

pub mod auth;
pub mod catalog_cache;
pub mod email;
pub mod inventory;
pub mod notifications;
pub mod orders;
