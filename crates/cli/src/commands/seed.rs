//! Seed the storefront database with demo data.
//!
//! Creates four categories, a customer (`test@example.com` / `password`), an
//! admin (`admin@example.com` / `adminpassword`), and randomly generated
//! clothing products. Accounts that already exist are left alone.

use rand::Rng;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use tracing::{info, warn};

use cornershop_core::{CategoryId, UserRole};
use cornershop_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};
use cornershop_storefront::models::{CategoryInput, ValidProduct};
use cornershop_storefront::services::auth::{AuthError, AuthService};

use super::{ConnectError, connect};

const CATEGORIES: [(&str, &str); 4] = [
    ("Tops", "T-shirts, polos, blouses and sweaters"),
    ("Bottoms", "Jeans, shorts and skirts"),
    ("Outerwear", "Jackets, coats and hoodies"),
    ("Formal", "Suits and dresses"),
];

const PRODUCT_TYPES: [&str; 12] = [
    "T-shirt", "Polo", "Jeans", "Hoodie", "Sweater", "Jacket", "Shorts", "Dress", "Skirt",
    "Blouse", "Suit", "Coat",
];

const ADJECTIVES: [&str; 12] = [
    "Slim", "Vintage", "Modern", "Classic", "Elegant", "Casual", "Trendy", "Athletic", "Premium",
    "Luxury", "Basic", "Designer",
];

const COLORS: [&str; 12] = [
    "Red", "Blue", "Green", "Black", "White", "Gray", "Navy", "Purple", "Pink", "Yellow",
    "Orange", "Brown",
];

/// Price range in cents (50.00 to 300.00).
const PRICE_CENTS: std::ops::RangeInclusive<i64> = 5_000..=30_000;
const STOCK: std::ops::RangeInclusive<i32> = 5..=50;
const PLACEHOLDER_IMAGE: &str = "https://placehold.co/200";

const DEMO_USERS: [(&str, &str, &str, UserRole); 2] = [
    ("Test User", "test@example.com", "password", UserRole::Customer),
    ("Admin User", "admin@example.com", "adminpassword", UserRole::Admin),
];

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Could not create user: {0}")]
    Auth(#[from] AuthError),
}

/// Seed categories, demo users, and `product_count` products.
pub async fn run(product_count: usize) -> Result<(), SeedError> {
    let pool = connect().await?;

    let categories = CategoryRepository::new(&pool);
    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        let category = categories
            .create(&CategoryInput {
                name: name.to_owned(),
                description: Some(description.to_owned()),
            })
            .await?;
        category_ids.push(category.id);
    }
    info!(count = category_ids.len(), "Categories created");

    let auth = AuthService::new(&pool);
    for (name, email, password, role) in DEMO_USERS {
        match auth.create_user(name, email, password, role).await {
            Ok(user) => info!(user_id = %user.id, email, %role, "User created"),
            Err(AuthError::UserAlreadyExists) => warn!(email, "User already exists, skipping"),
            Err(e) => return Err(e.into()),
        }
    }

    let generated = generate_products(&mut rand::rng(), product_count, &category_ids);
    let products = ProductRepository::new(&pool);
    for product in &generated {
        products.create(product).await?;
    }
    info!(count = product_count, "Products created");

    Ok(())
}

/// Random "Adjective Color Type" products spread over `category_ids`.
fn generate_products<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    category_ids: &[CategoryId],
) -> Vec<ValidProduct> {
    (0..count)
        .map(|_| {
            let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Classic");
            let color = COLORS.choose(rng).copied().unwrap_or("Black");
            let kind = PRODUCT_TYPES.choose(rng).copied().unwrap_or("T-shirt");

            ValidProduct {
                name: format!("{adjective} {color} {kind}"),
                description: Some(format!(
                    "High-quality {color} {kind} with {adjective} fit and modern design."
                )),
                price: Decimal::new(rng.random_range(PRICE_CENTS), 2),
                stock_quantity: rng.random_range(STOCK),
                category_id: category_ids.choose(rng).copied(),
                image_url: Some(PLACEHOLDER_IMAGE.to_owned()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_generated_products_are_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let categories = [CategoryId::new(1), CategoryId::new(2)];

        let products = generate_products(&mut rng, 100, &categories);

        assert_eq!(products.len(), 100);
        for product in &products {
            assert!(product.price >= Decimal::new(5_000, 2));
            assert!(product.price <= Decimal::new(30_000, 2));
            assert_eq!(product.price.scale(), 2);
            assert!(STOCK.contains(&product.stock_quantity));
            assert!(product.category_id.is_some_and(|id| categories.contains(&id)));
            assert_eq!(product.name.split(' ').count(), 3);
        }
    }

    #[test]
    fn test_no_categories_leaves_products_uncategorized() {
        let mut rng = StdRng::seed_from_u64(1);
        let products = generate_products(&mut rng, 3, &[]);
        assert!(products.iter().all(|p| p.category_id.is_none()));
    }
}
