//! HTTP API layer.
//!
//! Translates HTTP requests into service calls and formats responses as
//! [`dto::ResultData`] envelopes or [`crate::error::AppError`] bodies.
//!
//! # Modules
//!
//! - [`dto`] - Request and response payloads
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Firewall, admin guard, locks, rate limiting, sessions, tracing
//! - [`routes`] - Route configuration and composition

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
