//! Server-rendered page templates.

pub mod login;

pub use login::LoginTemplate;
