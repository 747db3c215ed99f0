//! HMAC-SHA256 signature arithmetic.
//!
//! Both Razorpay confirmation channels sign with HMAC-SHA256 and hex
//! encoding; they differ only in message and secret. Comparison is
//! constant-time.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `message` under `secret`.
#[must_use]
pub fn sign(secret: &str, message: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        // HMAC-SHA256 accepts keys of any length; this branch is dead.
        return String::new();
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a hex HMAC-SHA256 signature.
#[must_use]
pub fn verify(secret: &str, message: &[u8], signature: &str) -> bool {
    let expected = sign(secret, message);
    !expected.is_empty() && constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

/// The message the checkout channel signs.
#[must_use]
pub fn checkout_message(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_accepts() {
        let sig = sign("secret", b"payload");
        assert_eq!(sig.len(), 64);
        assert!(verify("secret", b"payload", &sig));
    }

    #[test]
    fn tampered_message_is_rejected() {
        let sig = sign("secret", b"payload");
        assert!(!verify("secret", b"payloae", &sig));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let sig = sign("secret", b"payload");
        assert!(!verify("other", b"payload", &sig));
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let sig = sign("secret", b"payload");
        assert!(!verify("secret", b"payload", &sig[..10]));
    }

    #[test]
    fn checkout_message_is_pipe_joined() {
        assert_eq!(checkout_message("order_1", "pay_2"), "order_1|pay_2");
    }

    #[test]
    fn signing_is_deterministic() {
        assert_eq!(sign("s", b"m"), sign("s", b"m"));
        assert_ne!(sign("s", b"m"), sign("s", b"n"));
    }
}
