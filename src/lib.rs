//! Shop Assist — chat-commerce backend core.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod search;
pub mod server;
