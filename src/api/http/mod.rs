// src/api/http/mod.rs

pub mod chat;
pub mod handlers;
pub mod router;

pub use chat::{REQUEST_ID_HEADER, chat_with_vision};
pub use router::create_router;
