//! Caller identity from the access proxy's signed assertion.
//!
//! The proxy in front of the management API forwards a JWT in a request
//! header. A [`TokenValidator`] turns that header value into an [`Identity`]
//! or an [`AuthError`].
//!
//! Two validators exist:
//! - [`JwksValidator`] checks the signature against the provider's published
//!   key set. This is the one to run in production.
//! - [`UnverifiedAssertionValidator`] only decodes the payload and checks its
//!   shape and expiry. It trusts whoever can reach the service, so it is only
//!   built when `auth.insecure_skip_verify` is set.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub mod jwks;
pub mod unverified;

pub use jwks::JwksValidator;
pub use unverified::UnverifiedAssertionValidator;

/// Authenticated caller. Never persisted; used for authorization and as
/// `createdBy` on writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub subject: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Identity attributed to writes made from the command line.
    pub fn operator(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            email: name.clone(),
            subject: name,
            issued_at: Some(Utc::now()),
            expires_at: None,
        }
    }
}

/// Why an assertion was rejected.
///
/// All variants produce the same 401 response; the distinction is only
/// for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing access assertion")]
    Missing,

    #[error("Malformed access assertion: {0}")]
    Malformed(String),

    #[error("Access assertion expired")]
    Expired,

    #[error("Access assertion signature rejected: {0}")]
    InvalidSignature(String),
}

impl AuthError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        AuthError::Malformed(msg.into())
    }

    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        AuthError::InvalidSignature(msg.into())
    }

    /// Short label for structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Malformed(_) => "malformed",
            AuthError::Expired => "expired",
            AuthError::InvalidSignature(_) => "invalid_signature",
        }
    }
}

/// Turns a raw assertion header value into an [`Identity`].
pub trait TokenValidator: Send + Sync {
    /// `None` (or an empty string) means the header was absent.
    fn validate(&self, token: Option<&str>) -> Result<Identity, AuthError>;

    fn name(&self) -> &'static str;
}

/// Claims read from the assertion payload.
///
/// Accepts both the registered JWT names (`sub`, `iat`, `exp`) and their
/// long forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "subject")]
    pub sub: Option<String>,
    #[serde(default, alias = "issuedAt")]
    pub iat: Option<i64>,
    #[serde(default, alias = "expiresAt")]
    pub exp: Option<i64>,
}

impl AccessClaims {
    /// Check required claims and expiry against `now`.
    pub fn into_identity(self, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::malformed("missing email claim"))?;
        let subject = self
            .sub
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::malformed("missing subject claim"))?;

        if let Some(exp) = self.exp
            && exp < now.timestamp()
        {
            return Err(AuthError::Expired);
        }

        Ok(Identity {
            email,
            subject,
            issued_at: self.iat.and_then(|t| DateTime::from_timestamp(t, 0)),
            expires_at: self.exp.and_then(|t| DateTime::from_timestamp(t, 0)),
        })
    }
}
