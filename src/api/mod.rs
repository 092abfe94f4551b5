//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair in the cache
//! - `GET /get/:key` - Read a value from the cache only
//! - `GET /resolve/:key` - Read through the cache to the backing source
//! - `PUT /source` - Insert into the backing source and the cache
//! - `DELETE /del/:key` - Drop a cached entry
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
