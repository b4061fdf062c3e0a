//! Development access tokens.
//!
//! Signs with the same `JWT_SECRET` and `JWT_TTL_SECONDS` the API uses, so
//! the token is accepted by a locally running server.

use storeline_api::auth::TokenService;
use storeline_api::config::JwtConfig;
use storeline_core::UserId;

/// Print a bearer token for `user_id`.
///
/// # Errors
///
/// Returns an error if the JWT configuration is missing or too weak, or
/// signing fails.
pub fn issue(user_id: uuid::Uuid, email: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = JwtConfig::from_env()?;
    let tokens = TokenService::new(&config.secret, config.ttl);
    let issued = tokens.issue(UserId::from_uuid(user_id), email)?;

    tracing::info!(user_id = %user_id, expires_at = %issued.expires_at, "Issued development token");

    #[allow(clippy::print_stdout)]
    {
        println!("{}", issued.token);
    }
    Ok(())
}
