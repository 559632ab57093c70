//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer and wraps the
//! vendor databases and HTTP APIs the service talks to.
//!
//! # Modules
//!
//! - [`cache`] - Key/value cache (Redis and in-memory implementations)
//! - [`firewall`] - IP access lists, word filters and abuse reporting
//! - [`geo`] - IP geolocation over local geo databases
//! - [`mail`] - Outbound mail delivery
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`settings`] - Cached system settings

pub mod cache;
pub mod firewall;
pub mod geo;
pub mod mail;
pub mod persistence;
pub mod settings;
