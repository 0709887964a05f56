use base64::{
    Engine,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use chrono::Utc;

use super::{AccessClaims, AuthError, Identity, TokenValidator};

/// Decode-only validator.
///
/// Checks that the assertion has the JWT shape, that its payload carries
/// `email` and a subject, and that it has not expired. The signature is NOT
/// verified: anyone able to reach the service can forge an identity. Use
/// [`super::JwksValidator`] anywhere that matters.
#[derive(Debug, Clone, Default)]
pub struct UnverifiedAssertionValidator;

impl UnverifiedAssertionValidator {
    pub fn new() -> Self {
        Self
    }

    /// Decode the payload segment of a three-part token.
    pub fn decode_claims(token: &str) -> Result<AccessClaims, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(AuthError::malformed("token must have 3 parts separated by dots"));
        }

        let payload = decode_segment(parts[1])?;
        let value: serde_json::Value = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::malformed(format!("payload is not JSON: {}", e)))?;
        if !value.is_object() {
            return Err(AuthError::malformed("payload is not a JSON object"));
        }

        serde_json::from_value(value)
            .map_err(|e| AuthError::malformed(format!("unexpected claim types: {}", e)))
    }
}

/// JWTs use base64url; tolerate standard alphabet and padding as well.
fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| AuthError::malformed(format!("payload is not base64: {}", e)))
}

impl TokenValidator for UnverifiedAssertionValidator {
    fn validate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::Missing)?;
        Self::decode_claims(token)?.into_identity(Utc::now())
    }

    fn name(&self) -> &'static str {
        "unverified"
    }
}
