// src/lib.rs

pub mod api;
pub mod attachment;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod llm;
pub mod prompt;
pub mod search;
pub mod sections;
pub mod services;
pub mod state;

pub use error::{QuestError, Result};
pub use state::AppState;
