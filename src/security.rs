use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Passwords and Session Tokens
// =============================================================================

/// Generate an opaque bearer token for a new session
pub fn generate_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Argon2id keyed with the server-side pepper
fn password_hasher(pepper: &str) -> Result<Argon2<'_>> {
    Argon2::new_with_secret(
        pepper.as_bytes(),
        Algorithm::Argon2id,
        Version::V0x13,
        Params::default(),
    )
    .map_err(|e| AppError::Internal(format!("Invalid password hashing parameters: {}", e)))
}

/// Hash a password into a PHC string (`$argon2id$v=19$...`)
///
/// The salt is random per call and embedded in the output. The pepper is
/// the Argon2 secret; it lives in the environment, not the database.
pub fn hash_password(password: &str, pepper: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to encode salt: {}", e)))?;

    let hash = password_hasher(pepper)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str, pepper: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };

    let Ok(hasher) = password_hasher(pepper) else {
        return false;
    };

    hasher.verify_password(password.as_bytes(), &parsed).is_ok()
}

// =============================================================================
// Webhook Signatures
// =============================================================================

/// Verify a Stripe-style webhook signature header
///
/// Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
/// The signed payload is `"{t}.{body}"` keyed with the endpoint secret.
/// Any matching `v1` entry is accepted, provided the timestamp is within
/// `tolerance_secs` of `now`.
pub fn verify_stripe_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> bool {
    let mut timestamp: Option<&str> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        tracing::warn!("Webhook signature header has no timestamp");
        return false;
    };

    let Ok(ts) = timestamp.parse::<i64>() else {
        tracing::warn!("Webhook signature timestamp is not numeric");
        return false;
    };

    if !validate_timestamp(ts, now, tolerance_secs) {
        return false;
    }

    signatures.iter().any(|signature| {
        let Ok(sig_bytes) = hex::decode(signature) else {
            tracing::warn!("Invalid hex signature format");
            return false;
        };

        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&sig_bytes).is_ok()
    })
}

/// Compute the `v1` signature for a payload (used by tests and tooling)
pub fn sign_stripe_payload(payload: &[u8], timestamp: i64, secret: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Validate timestamp is within acceptable range
///
/// Prevents replay attacks by ensuring the request is recent.
pub fn validate_timestamp(timestamp: i64, now: i64, max_age_secs: i64) -> bool {
    // Timestamps come from untrusted headers; the difference must not overflow
    let age_seconds = now.abs_diff(timestamp);

    if age_seconds > max_age_secs.unsigned_abs() {
        tracing::warn!(
            "Timestamp too old: {} seconds (max: {})",
            age_seconds,
            max_age_secs
        );
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEPPER: &str = "test-pepper";

    #[test]
    fn test_hash_password_is_salted_phc() {
        let a = hash_password("hunter22", PEPPER).unwrap();
        let b = hash_password("hunter22", PEPPER).unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct horse", PEPPER).unwrap();

        assert!(verify_password("correct horse", &hash, PEPPER));
        assert!(!verify_password("wrong horse", &hash, PEPPER));
        assert!(!verify_password("correct horse", &hash, "other-pepper"));
        assert!(!verify_password("correct horse", "not-a-phc-string", PEPPER));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_verify_stripe_signature_valid() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = 1_760_000_000;
        let sig = sign_stripe_payload(payload, now, "whsec_test");
        let header = format!("t={},v1={}", now, sig);

        assert!(verify_stripe_signature(payload, &header, "whsec_test", now, 300));
    }

    #[test]
    fn test_verify_stripe_signature_accepts_any_v1() {
        let payload = b"{}";
        let now = 1_760_000_000;
        let sig = sign_stripe_payload(payload, now, "whsec_test");
        let header = format!("t={},v1={},v1={}", now, "00".repeat(32), sig);

        assert!(verify_stripe_signature(payload, &header, "whsec_test", now, 300));
    }

    #[test]
    fn test_verify_stripe_signature_rejects_tampering() {
        let now = 1_760_000_000;
        let sig = sign_stripe_payload(b"{\"a\":1}", now, "whsec_test");
        let header = format!("t={},v1={}", now, sig);

        assert!(!verify_stripe_signature(b"{\"a\":2}", &header, "whsec_test", now, 300));
        assert!(!verify_stripe_signature(b"{\"a\":1}", &header, "whsec_other", now, 300));
    }

    #[test]
    fn test_verify_stripe_signature_rejects_stale_timestamp() {
        let signed_at = 1_760_000_000;
        let sig = sign_stripe_payload(b"{}", signed_at, "whsec_test");
        let header = format!("t={},v1={}", signed_at, sig);

        assert!(!verify_stripe_signature(b"{}", &header, "whsec_test", signed_at + 301, 300));
    }

    #[test]
    fn test_verify_stripe_signature_malformed_header() {
        assert!(!verify_stripe_signature(b"{}", "", "s", 0, 300));
        assert!(!verify_stripe_signature(b"{}", "v1=abcd", "s", 0, 300));
        assert!(!verify_stripe_signature(b"{}", "t=soon,v1=abcd", "s", 0, 300));
    }

    #[test]
    fn test_validate_timestamp() {
        assert!(validate_timestamp(1000, 1000, 300));
        assert!(validate_timestamp(1000, 1300, 300));
        assert!(!validate_timestamp(1000, 1301, 300));
        assert!(!validate_timestamp(1400, 1000, 300));
    }

    #[test]
    fn test_extreme_timestamps_are_rejected() {
        let now = 1_760_000_000;
        assert!(!validate_timestamp(i64::MIN, now, 300));
        assert!(!validate_timestamp(i64::MAX, now, 300));
        assert!(!validate_timestamp(i64::MIN, i64::MAX, 300));

        let header = format!("t={},v1={}", i64::MIN, "00");
        assert!(!verify_stripe_signature(b"{}", &header, "whsec_test", now, 300));
    }
}
