//! Business logic services for the application layer.

pub mod firewall_service;
pub mod user_service;
pub mod variable_service;

pub use firewall_service::FirewallService;
pub use user_service::UserService;
pub use variable_service::VariableService;
