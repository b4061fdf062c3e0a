//! Domain types.
//!
//! These are validated domain objects, separate from database row types and
//! from request bodies. Their `Serialize` impls define the JSON returned to
//! clients (camelCase).

pub mod cart;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, MAX_LINE_QUANTITY};
pub use notification::{NewNotification, Notification};
pub use order::{NewOrder, Order, OrderItem, ShippingAddress};
pub use payment::{CreatedPayment, NewPayment, Payment};
pub use product::{NewProduct, Product, ProductUpdate};
pub use user::{NewUser, User};
