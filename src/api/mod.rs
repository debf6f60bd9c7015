//! HTTP API layer.
//!
//! Routes live under `/api` and are protected by bearer-token auth;
//! `/health` is the only unauthenticated route. The router is
//! composable — `api_router()` returns a `Router` that can be mounted
//! on any axum server.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use types::ApiContext;
