//! Opaque bearer tokens.
//!
//! A token is 32 random bytes, hex-encoded for transport. Only the SHA-256
//! digest of the encoded text is persisted; the plaintext is handed to the
//! caller once, at issuance, and is recomputed into a digest on every
//! presentation.

use std::fmt;

use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::error::AppError;

/// Random bytes per secret (256 bits).
pub const TOKEN_BYTES: usize = 32;

pub type TokenDigest = [u8; 32];

/// Partition of tokens by purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    Authentication,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Authentication => "authentication",
        }
    }
}

/// Result of issuing a token. The only place the plaintext ever lives;
/// `Debug` leaves it out.
#[derive(Clone)]
pub struct IssuedToken {
    pub digest: TokenDigest,
    pub plaintext: String,
    pub user_id: i64,
    pub scope: TokenScope,
    pub expiry: OffsetDateTime,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("plaintext", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("scope", &self.scope)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// What the client receives after login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expiry: OffsetDateTime,
}

impl From<IssuedToken> for TokenResponse {
    fn from(t: IssuedToken) -> Self {
        Self {
            token: t.plaintext,
            expiry: t.expiry,
        }
    }
}

pub fn digest(secret: &str) -> TokenDigest {
    Sha256::digest(secret.as_bytes()).into()
}

pub fn issue(user_id: i64, scope: TokenScope, ttl: Duration) -> Result<IssuedToken, AppError> {
    issue_at(user_id, scope, ttl, OffsetDateTime::now_utc())
}

pub fn issue_at(
    user_id: i64,
    scope: TokenScope,
    ttl: Duration,
    now: OffsetDateTime,
) -> Result<IssuedToken, AppError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::Hashing(format!("token entropy: {e}")))?;
    let plaintext = hex::encode(bytes);
    Ok(IssuedToken {
        digest: digest(&plaintext),
        plaintext,
        user_id,
        scope,
        expiry: now + ttl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_secret_is_256_bits_of_hex() {
        let t = issue(1, TokenScope::Authentication, Duration::hours(24)).unwrap();
        assert_eq!(t.plaintext.len(), TOKEN_BYTES * 2);
        assert!(t.plaintext.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_matches_plaintext_and_is_deterministic() {
        let t = issue(1, TokenScope::Authentication, Duration::hours(1)).unwrap();
        assert_eq!(t.digest, digest(&t.plaintext));
        assert_eq!(digest("abc"), digest("abc"));
        assert_ne!(digest("abc"), digest("abd"));
        assert_ne!(&t.digest[..], t.plaintext.as_bytes());
    }

    #[test]
    fn each_issue_draws_a_new_secret() {
        let a = issue(1, TokenScope::Authentication, Duration::hours(1)).unwrap();
        let b = issue(1, TokenScope::Authentication, Duration::hours(1)).unwrap();
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn expiry_is_issuance_plus_ttl() {
        let now = OffsetDateTime::now_utc();
        let t = issue_at(7, TokenScope::Authentication, Duration::hours(24), now).unwrap();
        assert_eq!(t.expiry - now, Duration::hours(24));
        assert_eq!(t.user_id, 7);
        assert_eq!(t.scope.as_str(), "authentication");
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let t = issue(1, TokenScope::Authentication, Duration::hours(1)).unwrap();
        let shown = format!("{t:?}");
        assert!(!shown.contains(&t.plaintext));
        assert!(!shown.contains(&hex::encode(t.digest)));
        assert!(shown.contains("<redacted>"));
        assert!(shown.contains("user_id: 1"));
    }

    #[test]
    fn response_carries_plaintext_only() {
        let t = issue(1, TokenScope::Authentication, Duration::hours(1)).unwrap();
        let plaintext = t.plaintext.clone();
        let json = serde_json::to_value(TokenResponse::from(t)).unwrap();
        assert_eq!(json["token"], plaintext);
        assert!(json.get("digest").is_none());
        assert!(json["expiry"].is_string());
    }
}
