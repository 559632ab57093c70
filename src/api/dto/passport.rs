//! Form and query payloads for the passport endpoints.

use serde::Deserialize;

/// `GET /passport/login` query.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
}

/// `POST /passport/login` form. The password is RSA-encrypted by the page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Captcha answer.
    #[serde(default)]
    pub valid: String,
    /// Remember-me checkbox.
    #[serde(default)]
    pub remem: Option<String>,
    #[serde(rename = "__RequestVerificationToken", default)]
    pub request_verification_token: Option<String>,
}

impl LoginForm {
    pub fn remember_me(&self) -> bool {
        self.remem
            .as_deref()
            .is_some_and(|v| v.contains("on") || v.contains("true"))
    }
}

/// `POST /passport/checkvalidatecode` form.
#[derive(Debug, Default, Deserialize)]
pub struct CheckCodeForm {
    #[serde(default)]
    pub code: String,
}
