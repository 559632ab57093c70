//! Key/value variable managed from the admin panel.

use serde::Serialize;

/// A named value that templates and pages can reference by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Variable {
    pub id: i32,
    pub key: String,
    pub value: String,
}

/// Input data for creating or replacing a variable by key.
#[derive(Debug, Clone)]
pub struct UpsertVariable {
    pub key: String,
    pub value: String,
}
