//! my-claude - Thin web backend for chatting with Claude.
//!
//! Features:
//! - Forwards chat turns to the Anthropic Messages API
//! - Caller-held conversation history, extended atomically per turn
//! - Model catalog with USD pricing and daily USD→EUR conversion

pub mod api;
pub mod catalog;
pub mod claude;
pub mod config;
pub mod currency;
pub mod error;
pub mod http;
pub mod logger;
