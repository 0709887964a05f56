use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwap;
use chrono::Utc;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AccessClaims, AuthError, Identity, TokenValidator};

/// Signature-checking validator backed by the provider's JWKS.
///
/// The key set lives behind an [`ArcSwap`] so a background refresh can
/// replace it without blocking request handling.
pub struct JwksValidator {
    keys: ArcSwap<JwkSet>,
    audience: Option<String>,
    issuer: Option<String>,
}

impl JwksValidator {
    pub fn new(keys: JwkSet, audience: Option<String>, issuer: Option<String>) -> Self {
        Self {
            keys: ArcSwap::from_pointee(keys),
            audience: audience.filter(|a| !a.is_empty()),
            issuer: issuer.filter(|i| !i.is_empty()),
        }
    }

    /// Fetch a key set. Blocking; call from `spawn_blocking`.
    pub fn fetch(url: &str) -> anyhow::Result<JwkSet> {
        let keys: JwkSet = ureq::get(url)
            .call()
            .with_context(|| format!("Failed to fetch JWKS from {}", url))?
            .body_mut()
            .read_json()
            .with_context(|| format!("Invalid JWKS document at {}", url))?;
        Ok(keys)
    }

    /// Fetch the key set and build a validator from it.
    pub async fn from_endpoint(
        url: &str,
        audience: Option<String>,
        issuer: Option<String>,
    ) -> anyhow::Result<Self> {
        let keys = fetch_blocking(url.to_string()).await?;
        info!("Loaded {} signing keys from {}", keys.keys.len(), url);
        Ok(Self::new(keys, audience, issuer))
    }

    pub fn key_count(&self) -> usize {
        self.keys.load().keys.len()
    }

    /// Swap in a new key set.
    pub fn replace_keys(&self, keys: JwkSet) {
        self.keys.store(Arc::new(keys));
    }

    /// Periodically re-fetch the key set. A failed fetch keeps the old keys.
    pub fn spawn_refresh(self: &Arc<Self>, url: String, every: Duration) -> JoinHandle<()> {
        let validator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // 第一次 tick 立即返回，启动时已经加载过
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match fetch_blocking(url.clone()).await {
                    Ok(keys) => {
                        debug!("Refreshed JWKS: {} keys", keys.keys.len());
                        validator.replace_keys(keys);
                    }
                    Err(e) => warn!("JWKS refresh failed, keeping previous keys: {:#}", e),
                }
            }
        })
    }

    fn validation_for(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss.as_str()]);
        }
        validation
    }
}

async fn fetch_blocking(url: String) -> anyhow::Result<JwkSet> {
    tokio::task::spawn_blocking(move || JwksValidator::fetch(&url))
        .await
        .context("JWKS fetch task panicked")?
}

/// Algorithm to verify with: the key's own `alg` when it declares one.
///
/// A token whose header names a different algorithm is rejected.
fn signing_algorithm(jwk: &Jwk, requested: Algorithm) -> Result<Algorithm, AuthError> {
    let Some(declared) = jwk.common.key_algorithm else {
        return Ok(requested);
    };
    let pinned: Algorithm = declared
        .to_string()
        .parse()
        .map_err(|_| AuthError::invalid_signature(format!("key algorithm {} cannot sign tokens", declared)))?;
    if pinned != requested {
        return Err(AuthError::invalid_signature(format!(
            "token algorithm {:?} does not match key algorithm {:?}",
            requested, pinned
        )));
    }
    Ok(pinned)
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => AuthError::malformed(e.to_string()),
        _ => AuthError::invalid_signature(e.to_string()),
    }
}

impl TokenValidator for JwksValidator {
    fn validate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::Missing)?;

        let header = decode_header(token).map_err(|e| AuthError::malformed(e.to_string()))?;
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::invalid_signature("token header has no kid"))?;

        let keys = self.keys.load();
        let jwk = keys
            .find(kid)
            .ok_or_else(|| AuthError::invalid_signature(format!("unknown signing key {}", kid)))?;
        let alg = signing_algorithm(jwk, header.alg)?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| AuthError::invalid_signature(e.to_string()))?;

        let data = decode::<AccessClaims>(token, &key, &self.validation_for(alg))
            .map_err(map_jwt_error)?;
        data.claims.into_identity(Utc::now())
    }

    fn name(&self) -> &'static str {
        "jwks"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_keys() -> JwkSet {
        serde_json::from_value(serde_json::json!({ "keys": [] })).unwrap()
    }

    #[test]
    fn test_missing_token() {
        let validator = JwksValidator::new(empty_keys(), None, None);
        assert_eq!(validator.validate(None), Err(AuthError::Missing));
        assert_eq!(validator.validate(Some("")), Err(AuthError::Missing));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let validator = JwksValidator::new(empty_keys(), None, None);
        assert!(matches!(
            validator.validate(Some("not-a-jwt")),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_kid_is_rejected() {
        // header: {"alg":"RS256","kid":"k1"}; payload: {"email":"a@b.c","sub":"a"}
        let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6ImsxIn0.eyJlbWFpbCI6ImFAYi5jIiwic3ViIjoiYSJ9.c2ln";
        let validator = JwksValidator::new(empty_keys(), Some("aud".into()), None);
        assert!(matches!(
            validator.validate(Some(token)),
            Err(AuthError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_replace_keys() {
        let validator = JwksValidator::new(empty_keys(), None, None);
        assert_eq!(validator.key_count(), 0);

        let keys: JwkSet = serde_json::from_value(serde_json::json!({
            "keys": [{
                "kty": "oct",
                "kid": "local",
                "alg": "HS256",
                "k": "c2VjcmV0LXNlY3JldC1zZWNyZXQtc2VjcmV0"
            }]
        }))
        .unwrap();
        validator.replace_keys(keys);
        assert_eq!(validator.key_count(), 1);
    }

    #[test]
    fn test_token_algorithm_must_match_key() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let secret = b"secret-secret-secret-secret";
        let keys: JwkSet = serde_json::from_value(serde_json::json!({
            "keys": [{
                "kty": "oct",
                "kid": "local",
                "alg": "HS256",
                "k": base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, secret)
            }]
        }))
        .unwrap();
        let validator = JwksValidator::new(keys, None, None);

        // 同一密钥族，但与 JWK 声明的算法不同
        let mut header = Header::new(Algorithm::HS512);
        header.kid = Some("local".into());
        let claims = serde_json::json!({
            "email": "alice@example.com",
            "sub": "alice",
            "exp": Utc::now().timestamp() + 300,
        });
        let token = encode(&header, &claims, &EncodingKey::from_secret(secret)).unwrap();
        assert!(matches!(
            validator.validate(Some(&token)),
            Err(AuthError::InvalidSignature(_))
        ));

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("local".into());
        let token = encode(&header, &claims, &EncodingKey::from_secret(secret)).unwrap();
        assert!(validator.validate(Some(&token)).is_ok());
    }

    #[test]
    fn test_signed_token_round_trip() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let secret = b"secret-secret-secret-secret";
        let keys: JwkSet = serde_json::from_value(serde_json::json!({
            "keys": [{
                "kty": "oct",
                "kid": "local",
                "alg": "HS256",
                "k": base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, secret)
            }]
        }))
        .unwrap();
        let validator = JwksValidator::new(keys, Some("linkmap".into()), None);

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("local".into());
        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "email": "alice@example.com",
            "sub": "alice",
            "aud": "linkmap",
            "iat": now,
            "exp": now + 300,
        });
        let token = encode(&header, &claims, &EncodingKey::from_secret(secret)).unwrap();
        let identity = validator.validate(Some(&token)).unwrap();
        assert_eq!(identity.email, "alice@example.com");

        let expired = serde_json::json!({
            "email": "alice@example.com",
            "sub": "alice",
            "aud": "linkmap",
            "exp": now - 3600,
        });
        let token = encode(&header, &expired, &EncodingKey::from_secret(secret)).unwrap();
        assert_eq!(validator.validate(Some(&token)), Err(AuthError::Expired));

        let wrong_aud = serde_json::json!({
            "email": "alice@example.com",
            "sub": "alice",
            "aud": "someone-else",
            "exp": now + 300,
        });
        let token = encode(&header, &wrong_aud, &EncodingKey::from_secret(secret)).unwrap();
        assert!(matches!(
            validator.validate(Some(&token)),
            Err(AuthError::InvalidSignature(_))
        ));
    }
}
