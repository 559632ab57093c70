//! RSA login challenge.
//!
//! The login page hands the browser a fresh public key (PKCS#1 DER, base64)
//! and keeps the private key in the session. The browser encrypts the password
//! with PKCS#1 v1.5 padding before posting it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand_core::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

pub const KEY_BITS: usize = 1024;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("rsa error: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("key encoding error: {0}")]
    Encoding(#[from] rsa::pkcs1::Error),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decrypted password is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A generated key pair, both halves base64 encoded PKCS#1 DER.
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl RsaKeyPair {
    /// Generates a new key pair. CPU bound; call from a blocking task.
    pub fn generate() -> Result<Self, ChallengeError> {
        Self::generate_with_bits(KEY_BITS)
    }

    pub fn generate_with_bits(bits: usize) -> Result<Self, ChallengeError> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)?;
        let public_der = private.to_public_key().to_pkcs1_der()?;
        let private_der = private.to_pkcs1_der()?;

        Ok(Self {
            public_key: STANDARD.encode(public_der.as_bytes()),
            private_key: STANDARD.encode(private_der.as_bytes()),
        })
    }
}

/// Decrypts a base64 PKCS#1 v1.5 ciphertext with a base64 PKCS#1 DER private key.
pub fn decrypt(private_key: &str, ciphertext: &str) -> Result<String, ChallengeError> {
    let der = STANDARD.decode(private_key)?;
    let key = RsaPrivateKey::from_pkcs1_der(&der)?;
    // form posts that weren't URL-encoded turn '+' into spaces
    let ciphertext = STANDARD.decode(ciphertext.trim().replace(' ', "+"))?;
    let plain = key.decrypt(Pkcs1v15Encrypt, &ciphertext)?;
    Ok(String::from_utf8(plain)?)
}

/// Encrypts with a base64 PKCS#1 DER public key; what the login page does in the browser.
pub fn encrypt(public_key: &str, plaintext: &str) -> Result<String, ChallengeError> {
    let der = STANDARD.decode(public_key)?;
    let key = RsaPublicKey::from_pkcs1_der(&der)?;
    let cipher = key.encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext.as_bytes())?;
    Ok(STANDARD.encode(cipher))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_then_decrypt() {
        let pair = RsaKeyPair::generate_with_bits(512).unwrap();
        let cipher = encrypt(&pair.public_key, "s3cret!").unwrap();

        assert_eq!(decrypt(&pair.private_key, &cipher).unwrap(), "s3cret!");
    }

    #[test]
    fn test_decrypt_tolerates_unencoded_plus() {
        let pair = RsaKeyPair::generate_with_bits(512).unwrap();
        let cipher = encrypt(&pair.public_key, "pw").unwrap().replace('+', " ");

        assert_eq!(decrypt(&pair.private_key, &cipher).unwrap(), "pw");
    }

    #[test]
    fn test_decrypt_with_other_key_fails() {
        let pair = RsaKeyPair::generate_with_bits(512).unwrap();
        let other = RsaKeyPair::generate_with_bits(512).unwrap();
        let cipher = encrypt(&pair.public_key, "pw").unwrap();

        assert!(decrypt(&other.private_key, &cipher).is_err());
    }

    #[test]
    fn test_decrypt_garbage() {
        let pair = RsaKeyPair::generate_with_bits(512).unwrap();
        assert!(matches!(
            decrypt(&pair.private_key, "%%%"),
            Err(ChallengeError::Base64(_))
        ));
        assert!(decrypt("bm90IGEga2V5", "AAAA").is_err());
    }
}
