//! JWT access token validation
//!
//! Tokens are issued elsewhere (an OIDC provider); this service only
//! verifies them. The verification key is either a PEM public key
//! (RS256/ES256 families, auto-detected) or a shared HS256 secret.

use anyhow::{Context, Result, bail};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::core::config::ApiConfig;

/// Token validation error
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("access token has expired")]
    Expired,
    #[error("invalid access token: {0}")]
    Invalid(String),
}

/// The claims this service cares about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// OIDC subject of the caller
    pub sub: String,
    pub exp: i64,
}

pub struct AuthManager {
    decoding_key: DecodingKey,
    validation: Validation,
    admins: Vec<String>,
}

impl AuthManager {
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let (decoding_key, algorithms) = if let Some(path) = &config.jwt_pubkey_path {
            let pem = std::fs::read(path)
                .with_context(|| format!("failed to read JWT public key {}", path.display()))?;
            match DecodingKey::from_rsa_pem(&pem) {
                Ok(key) => (
                    key,
                    vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
                ),
                Err(_) => (
                    DecodingKey::from_ec_pem(&pem)
                        .context("JWT public key is neither RSA nor EC PEM")?,
                    vec![Algorithm::ES256, Algorithm::ES384],
                ),
            }
        } else if let Some(secret) = &config.jwt_secret {
            (
                DecodingKey::from_secret(secret.as_bytes()),
                vec![Algorithm::HS256],
            )
        } else {
            bail!("api.jwt_pubkey_path not set");
        };

        let mut validation = Validation::new(algorithms[0]);
        validation.algorithms = algorithms;
        validation.validate_exp = true;

        Ok(Self {
            decoding_key,
            validation,
            admins: config.admins.clone(),
        })
    }

    /// Verify signature and expiry, returning the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    /// Whether a subject is in the configured admin allow-list
    pub fn is_admin(&self, sub: &str) -> bool {
        self.admins.iter().any(|admin| admin == sub)
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};

    use super::*;

    fn manager(admins: &[&str]) -> AuthManager {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            admins: admins.iter().map(|s| s.to_string()).collect(),
            jwt_pubkey_path: None,
            jwt_secret: Some("test-secret".to_string()),
        };
        AuthManager::from_config(&config).unwrap()
    }

    fn token(secret: &str, sub: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: get_current_timestamp() as i64 + exp_offset,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_is_accepted() {
        let auth = manager(&["dummy"]);
        let claims = auth.validate_token(&token("test-secret", "dummy", 3600)).unwrap();
        assert_eq!(claims.sub, "dummy");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let auth = manager(&[]);
        let err = auth
            .validate_token(&token("other-secret", "dummy", 3600))
            .unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = manager(&[]);
        let err = auth
            .validate_token(&token("test-secret", "dummy", -3600))
            .unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn admin_allow_list() {
        let auth = manager(&["foo", "bar"]);
        assert!(auth.is_admin("foo"));
        assert!(!auth.is_admin("dummy"));
    }

    #[test]
    fn missing_key_material_fails() {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            admins: vec![],
            jwt_pubkey_path: None,
            jwt_secret: None,
        };
        assert!(AuthManager::from_config(&config).is_err());
    }
}
