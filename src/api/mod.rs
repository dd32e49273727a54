// src/api/mod.rs
// HTTP API: wire types, error responses, handlers and router

pub mod error;
pub mod http;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use http::create_router;
pub use types::*;
