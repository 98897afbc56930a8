//! API layer for HTTP request handling.
//!
//! - **[`handlers`]**: Axum route handlers for the landing page and the
//!   background-removal endpoint

pub mod handlers;
