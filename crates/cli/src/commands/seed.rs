//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! - name: Ceramic Mug
//!   description: 350 ml, dishwasher safe
//!   price: "10.99"
//!   currency: usd
//!   stock: 25
//! - name: Tea Towel
//!   price: "6.50"
//!   stock: 100
//! ```
//!
//! `currency` defaults to `DEFAULT_CURRENCY` (or `usd`).

use std::path::Path;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{error, info};

use storeline_api::db::{self, PgProductRepository, ProductRepository};
use storeline_api::models::NewProduct;
use storeline_core::{CurrencyCode, check_unit_price};

/// One product entry in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    pub stock: i32,
}

/// Problems that would make an entry fail to insert, one line each.
#[must_use]
pub fn validate_products(products: &[SeedProduct]) -> Vec<String> {
    let mut errors = Vec::new();
    for (index, product) in products.iter().enumerate() {
        let label = if product.name.trim().is_empty() {
            format!("entry {index}")
        } else {
            format!("entry {index} ({})", product.name)
        };
        if product.name.trim().is_empty() {
            errors.push(format!("{label}: name is required"));
        }
        if let Err(e) = check_unit_price(product.price) {
            errors.push(format!("{label}: price {e}"));
        }
        if product.stock < 0 {
            errors.push(format!("{label}: stock must not be negative"));
        }
    }
    errors
}

/// Insert products from a YAML file.
///
/// The whole file is parsed and validated before the database is touched.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot be
/// read or parsed, any entry is invalid, or an insert fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| "DATABASE_URL not set")?;
    let default_currency = match std::env::var("DEFAULT_CURRENCY") {
        Ok(code) => code.parse::<CurrencyCode>()?,
        Err(_) => CurrencyCode::default(),
    };

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let products: Vec<SeedProduct> = serde_yaml::from_str(&content)?;
    info!(products = products.len(), "Parsed seed file");

    let errors = validate_products(&products);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let repo = PgProductRepository::new(pool);
    for product in products {
        let created = repo
            .create(NewProduct {
                name: product.name,
                description: product.description,
                price: product.price,
                currency: product.currency.unwrap_or(default_currency),
                stock: product.stock,
            })
            .await?;
        info!(product_id = %created.id, name = %created.name, "Inserted product");
    }

    info!("Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_file() {
        let yaml = r#"
- name: Ceramic Mug
  description: 350 ml
  price: "10.99"
  currency: eur
  stock: 25
- name: Tea Towel
  price: "6.50"
  stock: 100
"#;
        let products: Vec<SeedProduct> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].currency, Some(CurrencyCode::Eur));
        assert_eq!(products[1].price, Decimal::new(650, 2));
        assert!(products[1].description.is_none());
        assert!(validate_products(&products).is_empty());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let products = vec![SeedProduct {
            name: " ".to_owned(),
            description: None,
            price: Decimal::ZERO,
            currency: None,
            stock: -1,
        }];
        let errors = validate_products(&products);
        assert_eq!(
            errors,
            [
                "entry 0: name is required",
                "entry 0: price must be greater than 0",
                "entry 0: stock must not be negative",
            ]
        );
    }

    #[test]
    fn test_validation_rejects_unstorable_prices() {
        let products: Vec<SeedProduct> = serde_yaml::from_str(
            r#"
- name: Fractional
  price: "1.005"
  stock: 1
"#,
        )
        .unwrap();
        assert_eq!(
            validate_products(&products),
            ["entry 0 (Fractional): price must have at most 2 decimal places"]
        );
    }
}
