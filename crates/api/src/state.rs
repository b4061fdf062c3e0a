//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;

use storeline_core::CurrencyCode;

use crate::auth::TokenService;
use crate::config::ApiConfig;
use crate::db::{
    CartRepository, NotificationRepository, OrderRepository, PaymentRepository,
    PgCartRepository, PgNotificationRepository, PgOrderRepository, PgPaymentRepository,
    PgProductRepository, PgUserRepository, ProductRepository, UserRepository,
};
use crate::email::{EmailError, EmailSender, SmtpEmailSender};
use crate::services::{
    CartService, CartServiceImpl, NotificationService, NotificationServiceImpl, OrderService,
    OrderServiceImpl, PaymentService, PaymentServiceImpl, ProductService, ProductServiceImpl,
    UserService, UserServiceImpl,
};
use crate::stripe::{PaymentProvider, StripeClient, StripeError};

/// Error building application state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment client: {0}")]
    Stripe(#[from] StripeError),
    #[error("email transport: {0}")]
    Email(#[from] EmailError),
}

/// Storage and provider implementations the services are built on.
pub struct Backends {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub mailer: Arc<dyn EmailSender>,
}

impl Backends {
    /// `PostgreSQL` repositories sharing one pool.
    #[must_use]
    pub fn postgres(
        pool: &PgPool,
        payment_provider: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool.clone())),
            payment_provider,
            mailer,
        }
    }

    /// In-memory repositories, for router-level tests.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn in_memory(
        payment_provider: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        use crate::db::memory::{
            InMemoryCartRepository, InMemoryNotificationRepository, InMemoryOrderRepository,
            InMemoryPaymentRepository, InMemoryProductRepository, InMemoryUserRepository,
        };

        Self {
            users: Arc::new(InMemoryUserRepository::default()),
            products: Arc::new(InMemoryProductRepository::default()),
            carts: Arc::new(InMemoryCartRepository::default()),
            orders: Arc::new(InMemoryOrderRepository::default()),
            payments: Arc::new(InMemoryPaymentRepository::default()),
            notifications: Arc::new(InMemoryNotificationRepository::default()),
            payment_provider,
            mailer,
        }
    }
}

/// Settings the services read at request time.
#[derive(Debug, Clone)]
pub struct StateSettings {
    pub tokens: TokenService,
    pub webhook_secret: SecretString,
    pub default_currency: CurrencyCode,
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the service objects handlers call and
/// the token service the auth extractor verifies with.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    tokens: TokenService,
    default_currency: CurrencyCode,
    /// Present when running against `PostgreSQL`; used by the readiness check.
    pool: Option<PgPool>,
    users: Arc<dyn UserService>,
    products: Arc<dyn ProductService>,
    carts: Arc<dyn CartService>,
    orders: Arc<dyn OrderService>,
    payments: Arc<dyn PaymentService>,
    notifications: Arc<dyn NotificationService>,
}

impl AppState {
    /// Wire services over the given backends.
    #[must_use]
    pub fn new(backends: Backends, settings: StateSettings, pool: Option<PgPool>) -> Self {
        let Backends {
            users,
            products,
            carts,
            orders,
            payments,
            notifications,
            payment_provider,
            mailer,
        } = backends;

        Self {
            inner: Arc::new(AppStateInner {
                users: Arc::new(UserServiceImpl::new(
                    users,
                    settings.tokens.clone(),
                    mailer.clone(),
                )),
                products: Arc::new(ProductServiceImpl::new(products.clone())),
                carts: Arc::new(CartServiceImpl::new(carts.clone(), products)),
                orders: Arc::new(OrderServiceImpl::new(orders.clone(), carts)),
                payments: Arc::new(PaymentServiceImpl::new(
                    payments,
                    orders,
                    payment_provider,
                    settings.webhook_secret,
                )),
                notifications: Arc::new(NotificationServiceImpl::new(notifications, mailer)),
                tokens: settings.tokens,
                default_currency: settings.default_currency,
                pool,
            }),
        }
    }

    /// Production wiring: `PostgreSQL`, Stripe and SMTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe client or SMTP transport cannot be built.
    pub fn from_config(config: &ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let stripe = StripeClient::new(&config.stripe)?;
        let mailer = SmtpEmailSender::new(&config.email).map_err(EmailError::Smtp)?;
        let backends = Backends::postgres(&pool, Arc::new(stripe), Arc::new(mailer));
        let settings = StateSettings {
            tokens: TokenService::new(&config.jwt.secret, config.jwt.ttl),
            webhook_secret: config.stripe.webhook_secret.clone(),
            default_currency: config.default_currency,
        };
        Ok(Self::new(backends, settings, Some(pool)))
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Currency for products created without one.
    #[must_use]
    pub fn default_currency(&self) -> CurrencyCode {
        self.inner.default_currency
    }

    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserService {
        self.inner.users.as_ref()
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductService {
        self.inner.products.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &dyn CartService {
        self.inner.carts.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderService {
        self.inner.orders.as_ref()
    }

    #[must_use]
    pub fn payments(&self) -> &dyn PaymentService {
        self.inner.payments.as_ref()
    }

    #[must_use]
    pub fn notifications(&self) -> &dyn NotificationService {
        self.inner.notifications.as_ref()
    }
}
