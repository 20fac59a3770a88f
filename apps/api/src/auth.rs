//! Caller identity from Clerk session tokens.
//!
//! Clerk issues RS256 JWTs; the verification key is configured as PEM. A non-PEM
//! key is treated as an HS256 shared secret, which is what tests and local
//! tooling use.

use anyhow::{Context, Result};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Clerk user id.
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iss: Option<String>,
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let (key, algorithm) = if config.jwt_key.trim_start().starts_with("-----BEGIN") {
            let key = DecodingKey::from_rsa_pem(config.jwt_key.as_bytes())
                .context("CLERK_JWT_KEY is not a valid RSA public key")?;
            (key, Algorithm::RS256)
        } else {
            (
                DecodingKey::from_secret(config.jwt_key.as_bytes()),
                Algorithm::HS256,
            )
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self { key, validation })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

/// Who is calling. `Verified` carries the token subject; `Anonymous` only
/// occurs when auth is not configured.
#[derive(Debug, Clone, PartialEq)]
pub enum Caller {
    Verified(String),
    Anonymous,
}

impl Caller {
    /// Settles the acting user id from the token and the `userId` the client sent.
    pub fn resolve(&self, claimed: Option<&str>) -> Result<String, AppError> {
        let claimed = claimed.map(str::trim).filter(|s| !s.is_empty());
        match (self, claimed) {
            (Caller::Verified(sub), Some(claimed)) if claimed != sub => Err(
                AppError::Unauthorized("userId does not match the signed-in user".to_string()),
            ),
            (Caller::Verified(sub), _) => Ok(sub.clone()),
            (Caller::Anonymous, Some(claimed)) => Ok(claimed.to_string()),
            (Caller::Anonymous, None) => Err(AppError::Unauthorized(
                "There is no connected user".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(verifier) = &state.auth else {
            return Ok(Caller::Anonymous);
        };

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".to_string(),
            )
        })?;

        let claims = verifier.verify(token).map_err(|e| {
            tracing::debug!("Rejected session token: {e}");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(Caller::Verified(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn hs_config() -> AuthConfig {
        AuthConfig {
            jwt_key: "test-secret".to_string(),
            issuer: None,
        }
    }

    fn token_for(sub: &str, exp: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp,
            iss: None,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_verifier_accepts_valid_hs256_token() {
        let verifier = JwtVerifier::from_config(&hs_config()).unwrap();
        let exp = chrono::Utc::now().timestamp() + 600;
        let claims = verifier.verify(&token_for("user_1", exp)).unwrap();
        assert_eq!(claims.sub, "user_1");
    }

    #[test]
    fn test_verifier_rejects_expired_token() {
        let verifier = JwtVerifier::from_config(&hs_config()).unwrap();
        let exp = chrono::Utc::now().timestamp() - 3600;
        assert!(verifier.verify(&token_for("user_1", exp)).is_err());
    }

    #[test]
    fn test_invalid_pem_is_a_config_error() {
        let config = AuthConfig {
            jwt_key: "-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----".to_string(),
            issuer: None,
        };
        assert!(JwtVerifier::from_config(&config).is_err());
    }

    #[test]
    fn test_resolve_verified_caller() {
        let caller = Caller::Verified("u1".to_string());
        assert_eq!(caller.resolve(None).unwrap(), "u1");
        assert_eq!(caller.resolve(Some("u1")).unwrap(), "u1");
        assert!(matches!(
            caller.resolve(Some("u2")),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_resolve_anonymous_caller_needs_user_id() {
        assert_eq!(Caller::Anonymous.resolve(Some("u1")).unwrap(), "u1");
        assert!(matches!(
            Caller::Anonymous.resolve(Some("  ")),
            Err(AppError::Unauthorized(_))
        ));
    }
}
