//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! validation, and business rules. Services consume repository traits and provide
//! a clean API for HTTP handlers.
//!
//! # Available Services
//!
//! - [`services::user_service::UserService`] - Login and account management
//! - [`services::variable_service::VariableService`] - Key/value variables
//! - [`services::firewall_service::FirewallService`] - Deny lists, deny areas, brute-force reports
//!
//! Background jobs are executed by [`job_worker::run_job_worker`].

pub mod job_worker;
pub mod services;
