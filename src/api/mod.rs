//! HTTP API layer.
//!
//! Report endpoints under a configurable mount path, wrapped in the CORS
//! policy and the caller identity middleware.

mod cors;
pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
