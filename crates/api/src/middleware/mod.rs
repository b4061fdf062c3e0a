//! HTTP middleware and request extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (tower-http request tracing)
//! 3. CORS
//! 4. Request logging (request id, request span, start/finish events)
//!
//! Authentication is per route, through the [`RequireAuth`] extractor.

pub mod auth;
pub mod request_log;

pub use auth::RequireAuth;
pub use request_log::{REQUEST_ID_HEADER, RequestContext, request_log_middleware};
