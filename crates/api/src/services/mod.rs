//! Business logic services.
//!
//! Each domain has a service trait (what handlers depend on) and one
//! implementation over repository traits and provider clients. Services
//! return [`AppError`](crate::error::AppError) directly: subsystem errors are
//! classified here and nowhere else.
//!
//! Every repository call goes through [`with_timeout`](crate::db::with_timeout).

pub mod carts;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use storeline_core::UserId;

use crate::error::{AppError, Result};

pub use carts::{CartService, CartServiceImpl};
pub use notifications::{NotificationRequest, NotificationService, NotificationServiceImpl};
pub use orders::{OrderService, OrderServiceImpl};
pub use payments::{PaymentService, PaymentServiceImpl, WebhookReceipt};
pub use products::{ProductService, ProductServiceImpl};
pub use users::{LoginOutcome, Registration, UserService, UserServiceImpl};

/// Fail with 403 unless `caller` owns the resource.
pub(crate) fn ensure_owner(owner: UserId, caller: UserId, resource: &str) -> Result<()> {
    if owner == caller {
        Ok(())
    } else {
        tracing::warn!(%caller, resource, "Access to another user's resource denied");
        Err(AppError::forbidden(format!(
            "you do not have access to this {resource}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_ensure_owner() {
        let me = UserId::new();
        assert!(ensure_owner(me, me, "order").is_ok());
        let err = ensure_owner(UserId::new(), me, "order").err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::Forbidden));
    }
}
