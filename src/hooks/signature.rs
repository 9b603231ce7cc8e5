use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::HookError;

type HmacSha256 = Hmac<Sha256>;

/// Checks `X-Hub-Signature-256: sha256=<hex>` against the HMAC-SHA256 of the raw body.
/// The comparison is constant-time.
pub fn verify(secret: &str, body: &[u8], header: Option<&str>) -> Result<(), HookError> {
    let header = header.ok_or(HookError::MissingSignature)?;
    let hex_sig = header
        .strip_prefix("sha256=")
        .ok_or(HookError::BadSignature)?;
    let expected = hex::decode(hex_sig).map_err(|_| HookError::BadSignature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| HookError::BadSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| HookError::BadSignature)
}

/// What GitHub would send for this body. Handy for tests and for poking the server by hand.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // hmac accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_passes() {
        let sig = sign("test-secret", b"hello world");
        assert!(verify("test-secret", b"hello world", Some(&sig)).is_ok());
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = sign("correct-secret", b"body");
        assert!(matches!(
            verify("wrong-secret", b"body", Some(&sig)),
            Err(HookError::BadSignature)
        ));
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign("secret", b"original body");
        assert!(verify("secret", b"tampered body", Some(&sig)).is_err());
    }

    #[test]
    fn missing_header_is_its_own_failure() {
        assert!(matches!(
            verify("secret", b"body", None),
            Err(HookError::MissingSignature)
        ));
    }

    #[test]
    fn bare_hex_and_junk_fail() {
        let sig = sign("secret", b"body");
        let raw_hex = sig.strip_prefix("sha256=").unwrap();
        assert!(verify("secret", b"body", Some(raw_hex)).is_err());
        assert!(verify("secret", b"body", Some("sha256=not-valid-hex!")).is_err());
    }
}
