//! Signed serialization of cookie values.
//!
//! A token carries a JSON-serialized value plus an HMAC-SHA256 tag keyed by
//! a secret salt. Only the holder of the salt can mint a token that
//! [`verify`] accepts.
//!
//! # Token format
//!
//! ```text
//! base64url(json(value)) "." hex(hmac_sha256(salt, base64url(json(value))))
//! ```
//!
//! Both halves use only URL-safe ASCII so a token can be stored verbatim in
//! a `Set-Cookie` header.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

use crate::error::SignerError;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound on token length; browsers cap a cookie at roughly 4 KiB.
pub const MAX_TOKEN_LEN: usize = 4096;

const SEPARATOR: char = '.';

/// Serialize `value` and append an authentication tag keyed by `salt`.
pub fn sign<T: Serialize + ?Sized>(value: &T, salt: &str) -> Result<String, SignerError> {
    let json =
        serde_json::to_vec(value).map_err(|e| SignerError::Serialization(e.to_string()))?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let tag = hex::encode(tag_for(salt, payload.as_bytes()));

    Ok(format!("{}{}{}", payload, SEPARATOR, tag))
}

/// Check the tag of `token` under `salt` and return the embedded value.
///
/// The tag is compared in constant time before the payload is decoded, so
/// no attacker-controlled bytes reach the JSON parser unauthenticated.
pub fn verify<T: DeserializeOwned>(token: &str, salt: &str) -> Result<T, SignerError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(SignerError::Malformed(format!(
            "token is {} bytes, limit is {}",
            token.len(),
            MAX_TOKEN_LEN
        )));
    }

    let mut parts = token.split(SEPARATOR);
    let (payload, tag) = match (parts.next(), parts.next(), parts.next()) {
        (Some(payload), Some(tag), None) if !payload.is_empty() && !tag.is_empty() => {
            (payload, tag)
        }
        _ => {
            return Err(SignerError::Malformed(
                "expected exactly two non-empty fields".to_string(),
            ))
        }
    };

    // Tags are minted lowercase; rejecting other spellings keeps tokens canonical.
    if !tag.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(SignerError::Malformed("tag is not lowercase hex".to_string()));
    }
    let tag = hex::decode(tag).map_err(|e| SignerError::Malformed(format!("tag: {}", e)))?;

    let mut mac = keyed_mac(salt);
    mac.update(payload.as_bytes());
    mac.verify_slice(&tag).map_err(|_| SignerError::Integrity)?;

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| SignerError::Malformed(format!("payload: {}", e)))?;

    serde_json::from_slice(&json).map_err(|e| SignerError::Serialization(e.to_string()))
}

fn keyed_mac(salt: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC can take key of any size")
}

fn tag_for(salt: &str, data: &[u8]) -> Vec<u8> {
    let mut mac = keyed_mac(salt);
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
