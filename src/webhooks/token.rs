//! `X-Gitlab-Token` verification.
//!
//! GitLab does not sign payloads; it echoes the configured secret in the
//! `X-Gitlab-Token` header. Both values are run through HMAC-SHA256 keyed
//! with the secret and the tags compared with `verify_slice`, which is
//! constant time, so neither the position of the first differing byte nor
//! the header length shows up in response timing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn tag(secret: &[u8], value: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(value);
    Some(mac)
}

/// Checks the request's token against the configured secret.
///
/// With no secret configured every request passes. With a secret, a missing
/// header fails.
pub fn verify_token(secret: Option<&str>, provided: Option<&[u8]>) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    let Some(provided) = provided else {
        return false;
    };

    let (Some(expected), Some(actual)) = (
        tag(secret.as_bytes(), secret.as_bytes()),
        tag(secret.as_bytes(), provided),
    ) else {
        return false;
    };

    actual.verify_slice(&expected.finalize().into_bytes()).is_ok()
}
