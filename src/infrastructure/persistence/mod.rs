//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx.
//!
//! # Repositories
//!
//! - [`PgUserRepository`] - User accounts
//! - [`PgVariableRepository`] - Key/value variables
//! - [`PgLoginRecordRepository`] - Login audit trail
//! - [`PgSettingsRepository`] - System settings

pub mod pg_login_record_repository;
pub mod pg_settings_repository;
pub mod pg_user_repository;
pub mod pg_variable_repository;

pub use pg_login_record_repository::PgLoginRecordRepository;
pub use pg_settings_repository::PgSettingsRepository;
pub use pg_user_repository::PgUserRepository;
pub use pg_variable_repository::PgVariableRepository;
