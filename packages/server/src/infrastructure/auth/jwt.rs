//! HS256 signed-claim AuthGate.
//!
//! Tokens are compact JWTs (`header.claims.signature`, base64url without
//! padding) carrying a `username` claim and an `exp` claim in Unix seconds.

use std::{sync::Arc, time::Duration};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hiroba_shared::time::{Clock, SystemClock};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::domain::{AuthError, AuthGate, Identity};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    username: Option<String>,
    exp: Option<i64>,
}

/// Verifies (and issues) HS256 tokens signed with a shared secret.
pub struct JwtAuthGate {
    secret: Vec<u8>,
    clock: Arc<dyn Clock>,
}

impl JwtAuthGate {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: impl Into<Vec<u8>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.into(),
            clock,
        }
    }

    /// Issue a token for `username` that expires after `ttl`.
    pub fn sign(&self, username: &str, ttl: Duration) -> Result<String, AuthError> {
        let exp = self.clock.now_millis() / 1000 + ttl.as_secs() as i64;
        let header = serde_json::json!({ "alg": ALGORITHM, "typ": "JWT" }).to_string();
        let claims = serde_json::json!({ "username": username, "exp": exp }).to_string();

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());
        Ok(format!("{}.{}", signing_input, signature))
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256, AuthError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::InvalidSignature)?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

impl AuthGate for JwtAuthGate {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed);
        };

        let header: Header = decode_json(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::Malformed)?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        self.mac(signing_input)?
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let claims: Claims = decode_json(claims_b64)?;
        let exp = claims.exp.ok_or(AuthError::MissingClaim("exp"))?;
        if exp.saturating_mul(1000) <= self.clock.now_millis() {
            return Err(AuthError::Expired);
        }

        let username = claims.username.ok_or(AuthError::MissingClaim("username"))?;
        Identity::new(username).map_err(|_| AuthError::MissingClaim("username"))
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed)
}
