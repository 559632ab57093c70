//! Repository trait definitions for the domain layer.
//!
//! These traits abstract data access following the Repository pattern and are
//! implemented by concrete repositories in `crate::infrastructure::persistence`.
//! Mock implementations are generated via `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`UserRepository`] - User accounts and credentials
//! - [`VariableRepository`] - Admin-managed key/value variables
//! - [`LoginRecordRepository`] - Login audit trail
//! - [`SettingsRepository`] - System settings
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod login_record_repository;
pub mod settings_repository;
pub mod user_repository;
pub mod variable_repository;

pub use login_record_repository::LoginRecordRepository;
pub use settings_repository::SettingsRepository;
pub use user_repository::UserRepository;
pub use variable_repository::VariableRepository;

#[cfg(test)]
pub use login_record_repository::MockLoginRecordRepository;
#[cfg(test)]
pub use settings_repository::MockSettingsRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
#[cfg(test)]
pub use variable_repository::MockVariableRepository;
