//! Request middleware.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger (every route): request id, status, latency
//! 2. Session auth (`/analyzer*` only): redirect to sign-in when absent

pub mod audit;
pub mod auth;
