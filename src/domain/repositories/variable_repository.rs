//! Repository trait for admin-managed variables.

use crate::domain::entities::{UpsertVariable, Variable};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for key/value variables.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgVariableRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VariableRepository: Send + Sync {
    /// Lists all variables ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list(&self) -> Result<Vec<Variable>, AppError>;

    /// Inserts the variable or replaces the value of the existing one with the same key.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn upsert(&self, variable: UpsertVariable) -> Result<u64, AppError>;

    /// Deletes a variable by id. Returns `false` when nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn delete(&self, id: i32) -> Result<bool, AppError>;
}
