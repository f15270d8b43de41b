//! Catalog types: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use cornershop_core::{CategoryId, MONEY_SCALE, ProductId};

use crate::error::ValidationErrors;

const MAX_NAME_LENGTH: usize = 255;
/// Largest amount a `NUMERIC(10,2)` column holds.
const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category_id: Option<CategoryId>,
    /// Name of the category, when the product has one.
    pub category_name: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryInput {
    /// Trim and validate the payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] naming each invalid field.
    pub fn validate(mut self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.name = self.name.trim().to_owned();
        check_name(&self.name, &mut errors);
        self.description = non_blank(self.description);

        if errors.is_empty() { Ok(self) } else { Err(errors) }
    }
}

/// Create/update payload for a product.
///
/// `stock_quantity` is signed so that negative input reaches validation
/// instead of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i64,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A product payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
}

impl ProductInput {
    /// Validate the payload.
    ///
    /// Category existence is checked by the caller, which has the database.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] naming each invalid field.
    pub fn validate(self) -> Result<ValidProduct, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self.name.trim().to_owned();
        check_name(&name, &mut errors);

        if self.price.is_sign_negative() {
            errors.add("price", "The price must be at least 0.");
        } else if self.price > MAX_PRICE {
            errors.add("price", format!("The price may not be greater than {MAX_PRICE}."));
        } else if self.price.normalize().scale() > MONEY_SCALE {
            errors.add("price", "The price may not have more than 2 decimal places.");
        }

        let stock_quantity = match i32::try_from(self.stock_quantity) {
            Ok(qty) if qty >= 0 => qty,
            Ok(_) => {
                errors.add("stock_quantity", "The stock quantity must be at least 0.");
                0
            }
            Err(_) => {
                errors.add("stock_quantity", "The stock quantity is too large.");
                0
            }
        };

        let image_url = non_blank(self.image_url);
        if let Some(url) = &image_url
            && !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/'))
        {
            errors.add("image_url", "The image url must be a valid URL.");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidProduct {
            name,
            description: non_blank(self.description),
            price: self.price,
            stock_quantity,
            category_id: self.category_id,
            image_url,
        })
    }
}

/// A validated product edit.
///
/// `stock_quantity` is `None` when the edit did not name a stock level. The
/// stored level is then left as orders have moved it, and `product`'s own
/// `stock_quantity` (copied from an unlocked read) is not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUpdate {
    pub product: ValidProduct,
    pub stock_quantity: Option<i32>,
}

/// Partial update payload for a product.
///
/// Absent fields keep their current value. For the nullable fields an explicit
/// `null` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
}

impl ProductPatch {
    /// Merge the patch over `current`, producing a full payload to validate.
    #[must_use]
    pub fn apply_to(self, current: &Product) -> ProductInput {
        ProductInput {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            price: self.price.unwrap_or(current.price),
            stock_quantity: self
                .stock_quantity
                .unwrap_or_else(|| i64::from(current.stock_quantity)),
            category_id: self.category_id.unwrap_or(current.category_id),
            image_url: self.image_url.unwrap_or_else(|| current.image_url.clone()),
        }
    }

    /// Merge over `current` and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] naming each invalid field.
    pub fn into_update(self, current: &Product) -> Result<ProductUpdate, ValidationErrors> {
        let sets_stock = self.stock_quantity.is_some();
        let product = self.apply_to(current).validate()?;
        Ok(ProductUpdate {
            stock_quantity: sets_stock.then_some(product.stock_quantity),
            product,
        })
    }
}

/// Distinguish a field sent as `null` (`Some(None)`) from an absent one
/// (`None`, via `#[serde(default)]`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_name(name: &str, errors: &mut ValidationErrors) {
    if name.is_empty() {
        errors.add("name", "The name field is required.");
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            "name",
            format!("The name may not be greater than {MAX_NAME_LENGTH} characters."),
        );
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "  Classic Navy Hoodie ".to_string(),
            description: Some("   ".to_string()),
            price: Decimal::from_str("49.99").unwrap(),
            stock_quantity: 12,
            category_id: Some(CategoryId::new(2)),
            image_url: None,
        }
    }

    #[test]
    fn test_max_price_constant() {
        assert_eq!(MAX_PRICE, Decimal::from_str("99999999.99").unwrap());
    }

    #[test]
    fn test_valid_product_is_trimmed() {
        let product = input().validate().unwrap();
        assert_eq!(product.name, "Classic Navy Hoodie");
        assert_eq!(product.description, None);
        assert_eq!(product.stock_quantity, 12);
    }

    #[test]
    fn test_invalid_product_reports_each_field() {
        let errors = ProductInput {
            name: String::new(),
            price: Decimal::from_str("-1").unwrap(),
            stock_quantity: -5,
            image_url: Some("ftp://nope".to_string()),
            ..input()
        }
        .validate()
        .unwrap_err();

        assert_eq!(errors.field("name").len(), 1);
        assert_eq!(errors.field("price").len(), 1);
        assert_eq!(errors.field("stock_quantity").len(), 1);
        assert_eq!(errors.field("image_url").len(), 1);
    }

    #[test]
    fn test_price_precision() {
        let ok = ProductInput {
            price: Decimal::from_str("10.500").unwrap(),
            ..input()
        };
        assert!(ok.validate().is_ok());

        let too_precise = ProductInput {
            price: Decimal::from_str("10.505").unwrap(),
            ..input()
        };
        assert!(too_precise.validate().is_err());
    }

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            name: "Classic Navy Hoodie".to_string(),
            description: Some("Warm".to_string()),
            price: Decimal::from_str("49.99").unwrap(),
            stock_quantity: 12,
            category_id: Some(CategoryId::new(2)),
            category_name: Some("Apparel".to_string()),
            image_url: Some("https://img.example.com/hoodie.jpg".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let patch: ProductPatch = serde_json::from_str(r#"{"price": "39.99"}"#).unwrap();
        let merged = patch.apply_to(&product()).validate().unwrap();

        assert_eq!(merged.price, Decimal::from_str("39.99").unwrap());
        assert_eq!(merged.name, "Classic Navy Hoodie");
        assert_eq!(merged.stock_quantity, 12);
        assert_eq!(merged.category_id, Some(CategoryId::new(2)));
        assert_eq!(merged.description.as_deref(), Some("Warm"));
    }

    #[test]
    fn test_price_only_edit_leaves_stock_unset() {
        let patch: ProductPatch = serde_json::from_str(r#"{"price": "45.00"}"#).unwrap();
        // Stock read before an order took three units.
        let stale = product();

        let update = patch.into_update(&stale).unwrap();

        assert_eq!(update.stock_quantity, None);
        assert_eq!(update.product.price, Decimal::from_str("45.00").unwrap());
    }

    #[test]
    fn test_explicit_stock_edit_is_kept() {
        let patch: ProductPatch = serde_json::from_str(r#"{"stock_quantity": 30}"#).unwrap();
        let update = patch.into_update(&product()).unwrap();
        assert_eq!(update.stock_quantity, Some(30));

        let patch: ProductPatch = serde_json::from_str(r#"{"stock_quantity": -1}"#).unwrap();
        let errors = patch.into_update(&product()).unwrap_err();
        assert_eq!(errors.field("stock_quantity").len(), 1);
    }

    #[test]
    fn test_patch_null_clears_nullable_fields() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"category_id": null, "image_url": null}"#).unwrap();
        let merged = patch.apply_to(&product()).validate().unwrap();

        assert_eq!(merged.category_id, None);
        assert_eq!(merged.image_url, None);
        assert_eq!(merged.description.as_deref(), Some("Warm"));
    }

    #[test]
    fn test_category_input_requires_name() {
        let errors = CategoryInput {
            name: " ".to_string(),
            description: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.field("name"), ["The name field is required."]);
    }
}
