//! Login challenge primitives.
//!
//! - [`rsa_challenge`] - per-session RSA key pair used to encrypt the login password
//! - [`captcha`] - captcha code generation and image rendering
//! - [`csrf`] - anti-forgery tokens for form posts

pub mod captcha;
pub mod csrf;
pub mod rsa_challenge;

pub use captcha::{CaptchaError, CaptchaRenderer, FontCaptchaRenderer, generate_code};
pub use rsa_challenge::{ChallengeError, RsaKeyPair};
