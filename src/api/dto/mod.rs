//! Data Transfer Objects for API requests and responses.
//!
//! All DTOs use Serde for serialization; request bodies with constraints are
//! checked with validator.

pub mod health;
pub mod passport;
pub mod result;
pub mod variables;

pub use result::ResultData;
