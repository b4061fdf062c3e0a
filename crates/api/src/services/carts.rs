//! Cart operations for the authenticated user.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use rust_decimal::Decimal;
use storeline_core::{CurrencyCode, ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError, with_timeout};
use crate::error::{AppError, Result};
use crate::models::{Cart, CartItem, MAX_LINE_QUANTITY};

/// Cart operations. Every method acts on the caller's own cart.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Create an empty cart. Fails with `DUPLICATE_ENTRY` if one exists.
    async fn create(&self, user_id: UserId) -> Result<Cart>;

    async fn get(&self, user_id: UserId) -> Result<Cart>;

    /// Add `quantity` of a product at its current catalog price, creating
    /// the cart first if the user has none.
    async fn add_item(&self, user_id: UserId, product_id: ProductId, quantity: u32)
    -> Result<Cart>;

    /// Replace the quantity of a line already in the cart.
    async fn update_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart>;

    async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<Cart>;
}

/// [`CartService`] over cart and product repositories.
pub struct CartServiceImpl {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

impl CartServiceImpl {
    #[must_use]
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { carts, products }
    }

    async fn existing(&self, user_id: UserId) -> Result<Cart> {
        with_timeout(self.carts.get_by_user(user_id))
            .await?
            .ok_or_else(|| AppError::not_found("cart not found"))
    }

    /// The user's cart, created on demand. A concurrent create is resolved
    /// by reading the winner's cart.
    async fn existing_or_new(&self, user_id: UserId) -> Result<Cart> {
        if let Some(cart) = with_timeout(self.carts.get_by_user(user_id)).await? {
            return Ok(cart);
        }
        match with_timeout(self.carts.create(user_id)).await {
            Ok(cart) => Ok(cart),
            Err(RepositoryError::Conflict(_)) => self.existing(user_id).await,
            Err(e) => Err(e.into()),
        }
    }
}

fn item_not_in_cart() -> AppError {
    AppError::not_found("item not in cart")
}

fn line_quantity_exceeded(held: u32) -> AppError {
    AppError::bad_request(format!(
        "a cart line may hold at most {MAX_LINE_QUANTITY} units"
    ))
    .with_detail(format!("cart already holds {held}"))
}

/// Fail if the cart total would not compute with `product_id` at `quantity`.
fn check_totals(
    cart: &Cart,
    product_id: ProductId,
    quantity: u32,
    unit_price: Decimal,
    currency: CurrencyCode,
) -> Result<()> {
    let mut items: Vec<CartItem> = cart
        .items
        .iter()
        .filter(|item| item.product_id != product_id)
        .cloned()
        .collect();
    items.push(CartItem {
        product_id,
        quantity,
        unit_price,
        currency,
    });
    Cart {
        items,
        ..cart.clone()
    }
    .total()?;
    Ok(())
}

#[async_trait]
impl CartService for CartServiceImpl {
    #[instrument(skip(self))]
    async fn create(&self, user_id: UserId) -> Result<Cart> {
        let cart = with_timeout(self.carts.create(user_id))
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AppError::duplicate_entry("cart already exists"),
                other => other.into(),
            })?;
        tracing::info!(cart_id = %cart.id, "Cart created");
        Ok(cart)
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: UserId) -> Result<Cart> {
        self.existing(user_id).await
    }

    #[instrument(skip(self))]
    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let product = with_timeout(self.products.get(product_id))
            .await?
            .ok_or_else(|| AppError::not_found("product not found"))?;

        let cart = self.existing_or_new(user_id).await?;
        if let Some(other) = cart.items.iter().find(|i| i.currency != product.currency) {
            return Err(AppError::bad_request("cart items must share one currency")
                .with_detail(format!(
                    "cart is in {}, product is in {}",
                    other.currency, product.currency
                )));
        }

        let held = cart.item(product_id).map_or(0, |item| item.quantity);
        let combined = held.saturating_add(quantity);
        if combined > MAX_LINE_QUANTITY {
            return Err(line_quantity_exceeded(held));
        }
        check_totals(&cart, product_id, combined, product.price, product.currency)?;

        with_timeout(self.carts.add_item(
            cart.id,
            CartItem {
                product_id,
                quantity,
                unit_price: product.price,
                currency: product.currency,
            },
        ))
        .await?;

        tracing::info!(cart_id = %cart.id, %product_id, quantity, "Item added to cart");
        self.existing(user_id).await
    }

    #[instrument(skip(self))]
    async fn update_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let cart = self.existing(user_id).await?;
        let line = cart.item(product_id).ok_or_else(item_not_in_cart)?;
        check_totals(&cart, product_id, quantity, line.unit_price, line.currency)?;
        if !with_timeout(self.carts.set_quantity(cart.id, product_id, quantity)).await? {
            return Err(item_not_in_cart());
        }
        self.existing(user_id).await
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<Cart> {
        let cart = self.existing(user_id).await?;
        if !with_timeout(self.carts.remove_item(cart.id, product_id)).await? {
            return Err(item_not_in_cart());
        }
        self.existing(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::{InMemoryCartRepository, InMemoryProductRepository};
    use crate::error::ErrorCode;
    use crate::models::NewProduct;

    struct Fixture {
        service: CartServiceImpl,
        products: Arc<InMemoryProductRepository>,
    }

    fn fixture() -> Fixture {
        let products = Arc::new(InMemoryProductRepository::default());
        Fixture {
            service: CartServiceImpl::new(
                Arc::new(InMemoryCartRepository::default()),
                products.clone(),
            ),
            products,
        }
    }

    async fn product(products: &InMemoryProductRepository, cents: i64, currency: CurrencyCode) -> ProductId {
        products
            .create(NewProduct {
                name: "Widget".to_owned(),
                description: None,
                price: Decimal::new(cents, 2),
                currency,
                stock: 10,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_add_item_creates_cart() {
        let f = fixture();
        let user = UserId::new();
        let widget = product(&f.products, 1099, CurrencyCode::Usd).await;

        let cart = f.service.add_item(user, widget, 2).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total().unwrap().unwrap().amount, Decimal::new(2198, 2));

        let again = f.service.add_item(user, widget, 1).await.unwrap();
        assert_eq!(again.id, cart.id);
        assert_eq!(again.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let f = fixture();
        let user = UserId::new();
        f.service.create(user).await.unwrap();
        let err = f.service.create(user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);
    }

    #[tokio::test]
    async fn test_get_without_cart() {
        let err = fixture().service.get(UserId::new()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let err = fixture()
            .service
            .add_item(UserId::new(), ProductId::new(), 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_currency_mixing_rejected() {
        let f = fixture();
        let user = UserId::new();
        let usd = product(&f.products, 500, CurrencyCode::Usd).await;
        let eur = product(&f.products, 500, CurrencyCode::Eur).await;

        f.service.add_item(user, usd, 1).await.unwrap();
        let err = f.service.add_item(user, eur, 1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(f.service.get(user).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let f = fixture();
        let user = UserId::new();
        let widget = product(&f.products, 250, CurrencyCode::Usd).await;
        f.service.add_item(user, widget, 1).await.unwrap();

        let cart = f.service.update_item(user, widget, 4).await.unwrap();
        assert_eq!(cart.items[0].quantity, 4);

        let cart = f.service.remove_item(user, widget).await.unwrap();
        assert!(cart.is_empty());

        let err = f.service.remove_item(user, widget).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        let err = f.service.update_item(user, widget, 2).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_line_quantity_is_capped_across_adds() {
        let f = fixture();
        let user = UserId::new();
        let widget = product(&f.products, 250, CurrencyCode::Usd).await;

        f.service.add_item(user, widget, 1000).await.unwrap();
        let err = f.service.add_item(user, widget, 1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(f.service.get(user).await.unwrap().items[0].quantity, 1000);
    }

    #[tokio::test]
    async fn test_overflowing_total_is_rejected() {
        let f = fixture();
        let user = UserId::new();
        let priceless = f
            .products
            .create(NewProduct {
                name: "Priceless".to_owned(),
                description: None,
                price: Decimal::MAX,
                currency: CurrencyCode::Usd,
                stock: 1,
            })
            .await
            .unwrap()
            .id;

        let err = f.service.add_item(user, priceless, 2).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert!(f.service.get(user).await.unwrap().is_empty());
    }
}
