//! Server-rendered pages.
//!
//! Uses Askama templates from `templates/`. The login page is served by
//! [`crate::api::handlers::passport::login_page`].

pub mod handlers;
