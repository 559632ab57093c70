//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod passport;
pub mod variables;

pub use health::health_handler;
pub use variables::{delete_variable, list_variables, save_variable};
