//! Webhook signature verification.
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 using the
//! endpoint secret and sends `Stripe-Signature: t=<ts>,v1=<hex>[,v1=...]`.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;

use super::StripeError;
use super::types::Event;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum accepted age (either direction) of a signed timestamp, in seconds.
pub const TOLERANCE_SECS: i64 = 300;

/// Verify `payload` against a `Stripe-Signature` header value.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` if the header is malformed, the
/// timestamp is outside [`TOLERANCE_SECS`] of `now`, or no `v1` signature
/// matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature(
            "no v1 signature".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::InvalidSignature("Invalid timestamp".to_string()))?;
    let within_tolerance = now
        .checked_sub(ts)
        .is_some_and(|skew| skew.unsigned_abs() <= TOLERANCE_SECS.unsigned_abs());
    if !within_tolerance {
        return Err(StripeError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_signature(payload, timestamp, secret.expose_secret())?;
    if !signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        return Err(StripeError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    debug!("Stripe webhook signature verified");
    Ok(())
}

/// Verify the signature, then decode the event.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` as [`verify_signature`] does, or
/// `StripeError::InvalidPayload` if the verified body is not an event.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    now: i64,
) -> Result<Event, StripeError> {
    verify_signature(payload, header, secret, now)?;
    serde_json::from_slice(payload).map_err(|e| StripeError::InvalidPayload(e.to_string()))
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// Used by tests and local tooling to post signed events.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` if the secret cannot key an HMAC.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, StripeError> {
    let signature = compute_signature(payload, &timestamp.to_string(), secret)?;
    Ok(format!("t={timestamp},v1={signature}"))
}

fn compute_signature(payload: &[u8], timestamp: &str, secret: &str) -> Result<String, StripeError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;
    const PAYLOAD: &[u8] =
        br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"object":"payment_intent","id":"pi_1"}}}"#;

    fn secret() -> SecretString {
        SecretString::from(SECRET)
    }

    #[test]
    fn test_valid_signature() {
        let header = signature_header(PAYLOAD, SECRET, NOW).unwrap();
        assert!(verify_signature(PAYLOAD, &header, &secret(), NOW + 10).is_ok());
        let event = construct_event(PAYLOAD, &header, &secret(), NOW).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
    }

    #[test]
    fn test_any_v1_may_match() {
        let good = signature_header(PAYLOAD, SECRET, NOW).unwrap();
        let v1 = good.split_once(",v1=").unwrap().1;
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={v1}");
        assert!(verify_signature(PAYLOAD, &header, &secret(), NOW).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = signature_header(PAYLOAD, SECRET, NOW).unwrap();
        let result = verify_signature(b"{\"id\":\"evt_2\"}", &header, &secret(), NOW);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = signature_header(PAYLOAD, "whsec_other", NOW).unwrap();
        assert!(verify_signature(PAYLOAD, &header, &secret(), NOW).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = signature_header(PAYLOAD, SECRET, NOW).unwrap();
        let result = verify_signature(PAYLOAD, &header, &secret(), NOW + TOLERANCE_SECS + 1);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let no_signature = format!("t={NOW}");
        for header in [
            "",
            "garbage",
            "t=abc,v1=00",
            "v1=00",
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
            no_signature.as_str(),
        ] {
            assert!(
                verify_signature(PAYLOAD, header, &secret(), NOW).is_err(),
                "{header}"
            );
        }
    }

    #[test]
    fn test_signed_non_event_is_invalid_payload() {
        let body = b"[1,2,3]";
        let header = signature_header(body, SECRET, NOW).unwrap();
        assert!(matches!(
            construct_event(body, &header, &secret(), NOW),
            Err(StripeError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }
}
