//! HTTP middleware for request processing and protection.
//!
//! Provides the firewall, admin guard, request locks, rate limiting,
//! sessions and observability.

pub mod admin;
pub mod distributed_lock;
pub mod firewall;
pub mod rate_limit;
pub mod session;
pub mod tracing;
