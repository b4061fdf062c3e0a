//! Catalog management.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use storeline_core::ProductId;

use crate::db::{ProductRepository, with_timeout};
use crate::error::{AppError, Result};
use crate::models::{NewProduct, Product, ProductUpdate};
use crate::pagination::{Page, Pagination};

/// Catalog operations.
#[async_trait]
pub trait ProductService: Send + Sync {
    async fn list(&self, page: Pagination) -> Result<Page<Product>>;

    async fn get(&self, id: ProductId) -> Result<Product>;

    async fn create(&self, product: NewProduct) -> Result<Product>;

    async fn update(&self, id: ProductId, update: ProductUpdate) -> Result<Product>;

    async fn delete(&self, id: ProductId) -> Result<()>;
}

/// [`ProductService`] over a [`ProductRepository`].
pub struct ProductServiceImpl {
    products: Arc<dyn ProductRepository>,
}

impl ProductServiceImpl {
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

fn product_not_found() -> AppError {
    AppError::not_found("product not found")
}

#[async_trait]
impl ProductService for ProductServiceImpl {
    #[instrument(skip(self))]
    async fn list(&self, page: Pagination) -> Result<Page<Product>> {
        let (items, total) = with_timeout(self.products.list(page)).await?;
        Ok(Page::new(items, page, total))
    }

    #[instrument(skip(self))]
    async fn get(&self, id: ProductId) -> Result<Product> {
        with_timeout(self.products.get(id))
            .await?
            .ok_or_else(product_not_found)
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create(&self, product: NewProduct) -> Result<Product> {
        let created = with_timeout(self.products.create(product)).await?;
        tracing::info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        with_timeout(self.products.update(id, update))
            .await?
            .ok_or_else(product_not_found)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: ProductId) -> Result<()> {
        if with_timeout(self.products.delete(id)).await? {
            tracing::info!(product_id = %id, "Product deleted");
            Ok(())
        } else {
            Err(product_not_found())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use storeline_core::CurrencyCode;

    use super::*;
    use crate::db::memory::InMemoryProductRepository;
    use crate::error::ErrorCode;

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            description: None,
            price: Decimal::new(1099, 2),
            currency: CurrencyCode::Usd,
            stock: 5,
        }
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let products = ProductServiceImpl::new(Arc::new(InMemoryProductRepository::default()));
        let created = products.create(new_product("Mug")).await.unwrap();

        let updated = products
            .update(
                created.id,
                ProductUpdate {
                    stock: Some(9),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 9);
        assert_eq!(updated.name, "Mug");

        products.delete(created.id).await.unwrap();
        let err = products.get(created.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            products.delete(created.id).await.unwrap_err().code(),
            ErrorCode::NotFound
        );
    }

    #[tokio::test]
    async fn test_list_pages() {
        let products = ProductServiceImpl::new(Arc::new(InMemoryProductRepository::default()));
        for i in 0..3 {
            products.create(new_product(&format!("P{i}"))).await.unwrap();
        }
        let page = products
            .list(Pagination::from_query("page=2&pageSize=2"))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].name, "P0");
    }
}
