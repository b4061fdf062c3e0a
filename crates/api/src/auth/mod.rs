//! Authentication primitives.
//!
//! Stateless: access tokens are HMAC-signed JWTs verified on every request,
//! and passwords are stored as Argon2id hashes.

mod error;
mod password;
mod token;

pub use error::AuthError;
pub use password::{hash_password, reject_unknown_user, verify_password};
pub use token::{Claims, IssuedToken, TokenService};
