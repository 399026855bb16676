//! Signed, single-use resumption tokens.
//!
//! Wire format: `base64url(JSON claims) "." base64url(HMAC-SHA256(secret,
//! claims))`. The secret never appears in the token; flipping any bit of the
//! bound fields invalidates the MAC. Single-use is enforced by the run
//! store, not here: the signer only vouches for integrity and expiry.

use crate::core::DecisionIntent;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Token verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Malformed token or signature mismatch.
    #[error("invalid token: {0}")]
    Invalid(String),
    /// The token's validity window has passed.
    #[error("token expired")]
    Expired,
    /// The token was consumed by an earlier resumption.
    #[error("token already used")]
    AlreadyUsed,
}

/// The fields a resumption token binds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The suspended run this token resumes.
    pub run_id: Uuid,
    /// The decision this token carries.
    pub action: DecisionIntent,
    /// Issuance time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// Unique token id, recorded on consumption for single-use.
    pub token_id: String,
}

/// A minted token: claims plus the signed wire value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumptionToken {
    /// The bound claims.
    pub claims: TokenClaims,
    /// The signed wire value handed to the notification channel.
    pub value: String,
}

/// Mints and verifies resumption tokens with an HMAC-SHA256 secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Creates a signer from a secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Mints a token for a run and action, valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if the claims cannot be encoded.
    pub fn mint(
        &self,
        run_id: Uuid,
        action: DecisionIntent,
        ttl: Duration,
    ) -> Result<ResumptionToken, TokenError> {
        self.mint_at(run_id, action, ttl, Utc::now())
    }

    /// Mints a token with an explicit clock.
    pub fn mint_at(
        &self,
        run_id: Uuid,
        action: DecisionIntent,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<ResumptionToken, TokenError> {
        let claims = TokenClaims {
            run_id,
            action,
            issued_at: now,
            expires_at: now + ttl,
            token_id: Uuid::new_v4().simple().to_string(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| TokenError::Invalid(format!("claims encoding: {e}")))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.sign(payload_b64.as_bytes())?;
        let value = format!("{payload_b64}.{}", URL_SAFE_NO_PAD.encode(signature));
        Ok(ResumptionToken { claims, value })
    }

    /// Verifies a token against the current clock.
    ///
    /// # Errors
    ///
    /// [`TokenError::Invalid`] on malformed input or signature mismatch,
    /// [`TokenError::Expired`] past the validity window. Integrity is
    /// checked before expiry, so a tampered expiry reads as invalid, not
    /// expired.
    pub fn verify(&self, value: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(value, Utc::now())
    }

    /// Verifies a token with an explicit clock.
    pub fn verify_at(&self, value: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let (payload_b64, signature_b64) = value
            .split_once('.')
            .ok_or_else(|| TokenError::Invalid("malformed token".to_string()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Invalid("malformed signature".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| TokenError::Invalid("bad signing key".to_string()))?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Invalid("signature mismatch".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Invalid("malformed payload".to_string()))?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|e| TokenError::Invalid(format!("claims decoding: {e}")))?;

        if now > claims.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| TokenError::Invalid("bad signing key".to_string()))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
