//! Core domain entities representing the business data model.
//!
//! Entities are plain data structures without business logic.
//!
//! # Entity Types
//!
//! - [`User`] / [`UserInfo`] - A registered user and its session projection
//! - [`Variable`] - An admin-managed key/value pair
//! - [`LoginRecord`] - An audited login event
//!
//! Creation inputs use separate structs (`NewUser`, `UpsertVariable`, `NewLoginRecord`).

pub mod login_record;
pub mod user;
pub mod variable;

pub use login_record::{LoginRecord, LoginType, NewLoginRecord};
pub use user::{NewUser, User, UserInfo};
pub use variable::{UpsertVariable, Variable};
