//! Endpoint handlers.

pub mod ai_response;
pub mod analyzer;
pub mod health;
