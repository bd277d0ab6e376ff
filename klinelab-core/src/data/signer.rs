//! Request signing.
//!
//! The exchange authenticates a request with an HMAC-SHA256 signature over
//! `timestamp + api_key + recv_window + payload`, keyed by the API secret and
//! hex encoded. The payload is the JSON-serialized query object.

use super::error::DataError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Value of the `X-BAPI-SIGN-TYPE` header for HMAC signatures.
pub const SIGN_TYPE_HMAC: &str = "2";

/// Everything a signer needs besides the payload.
#[derive(Clone, Copy)]
pub struct SigningCredentials<'a> {
    pub api_key: &'a str,
    pub api_secret: &'a str,
    pub recv_window: u64,
    pub timestamp: i64,
}

/// Produces the signature for one request.
pub trait Signer: Send + Sync {
    fn sign(&self, payload: &str, credentials: &SigningCredentials<'_>) -> Result<String, DataError>;
}

/// HMAC-SHA256 signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl Signer for HmacSigner {
    fn sign(&self, payload: &str, credentials: &SigningCredentials<'_>) -> Result<String, DataError> {
        let mut mac = HmacSha256::new_from_slice(credentials.api_secret.as_bytes())
            .map_err(|e| DataError::Authentication(format!("HMAC key error: {e}")))?;
        mac.update(credentials.timestamp.to_string().as_bytes());
        mac.update(credentials.api_key.as_bytes());
        mac.update(credentials.recv_window.to_string().as_bytes());
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Authentication headers for a signed request.
pub fn auth_headers(
    signer: &dyn Signer,
    payload: &str,
    credentials: &SigningCredentials<'_>,
) -> Result<Vec<(&'static str, String)>, DataError> {
    let signature = signer.sign(payload, credentials)?;
    Ok(vec![
        ("X-BAPI-API-KEY", credentials.api_key.to_string()),
        ("X-BAPI-SIGN", signature),
        ("X-BAPI-SIGN-TYPE", SIGN_TYPE_HMAC.to_string()),
        ("X-BAPI-TIMESTAMP", credentials.timestamp.to_string()),
        ("X-BAPI-RECV-WINDOW", credentials.recv_window.to_string()),
    ])
}
