//! Opaque credential verifier
//!
//! PBKDF2-HMAC-SHA256 with a per-user random salt, serialized as
//! `pbkdf2-sha256$<iterations>$<salt>$<derived>` with base64url fields.
//! Verification goes through `ring::pbkdf2::verify`, which compares in
//! constant time. Nothing outside this module depends on the format.

use std::num::NonZeroU32;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::pbkdf2;
use ring::rand::SecureRandom;

use crate::userdb::errors::UserError;

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const ITERATIONS: u32 = 120_000;
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = 32;

pub(super) fn hash_password(password: &str) -> Result<String, UserError> {
    let rng = ring::rand::SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| UserError::Storage("Failed to generate salt".to_string()))?;

    let iterations = NonZeroU32::new(ITERATIONS).expect("ITERATIONS is non-zero");
    let mut derived = [0u8; CREDENTIAL_LEN];
    pbkdf2::derive(ALGORITHM, iterations, &salt, password.as_bytes(), &mut derived);

    Ok(format!(
        "pbkdf2-sha256${}${}${}",
        ITERATIONS,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(derived)
    ))
}

pub(super) fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some("pbkdf2-sha256"), Some(iterations), Some(salt), Some(derived), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let Ok(salt) = URL_SAFE_NO_PAD.decode(salt) else {
        return false;
    };
    let Ok(derived) = URL_SAFE_NO_PAD.decode(derived) else {
        return false;
    };

    pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &derived).is_ok()
}
