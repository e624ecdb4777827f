use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use super::IdentityVerifier;
use crate::{
    config::JwtConfig,
    models::{Identity, UserId, UserRole},
    Error, Result,
};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    /// viewer, streamer, moderator or admin
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::from_string(self.user_id.clone())
    }

    /// Parse role from string
    pub fn role(&self) -> Result<UserRole> {
        UserRole::from_str(&self.role)
            .map_err(|_| Error::Authentication(format!("Invalid role in token: {}", self.role)))
    }

    pub fn into_identity(self) -> Result<Identity> {
        let role = self.role()?;
        Ok(Identity::new(self.user_id(), self.username, role))
    }
}

/// HS256 token signing and verification with a shared secret
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    algorithm: Algorithm,
    leeway_seconds: u64,
    access_token_ttl: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &self.algorithm)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(Error::Internal("JWT secret must not be empty".to_string()));
        }
        let secret = config.secret.as_bytes();

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            algorithm: Algorithm::HS256,
            leeway_seconds: config.leeway_seconds,
            access_token_ttl: Duration::minutes(config.access_token_minutes),
        })
    }

    /// Issue an access token for the identity
    pub fn sign_token(&self, identity: &Identity) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id: identity.user_id.as_str().to_string(),
            username: identity.username.clone(),
            role: identity.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_token_ttl).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify a token and extract claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = self.leeway_seconds;
        validation.set_required_spec_claims(&["exp"]);

        let token_data: TokenData<Claims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Authentication("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    Error::Authentication("Invalid token".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    Error::Authentication("Invalid token signature".to_string())
                }
                _ => Error::Authentication(format!("Token verification failed: {e}")),
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl IdentityVerifier for JwtService {
    async fn verify(&self, token: &str) -> Result<Identity> {
        self.verify_token(token)?.into_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "test-secret".to_string(),
            leeway_seconds: 0,
            access_token_minutes: 15,
        })
        .unwrap()
    }

    fn identity() -> Identity {
        Identity::new(UserId::from("user123"), "alice".to_string(), UserRole::Streamer)
    }

    #[tokio::test]
    async fn test_sign_and_verify() {
        let jwt = service();
        let token = jwt.sign_token(&identity()).unwrap();

        let verified = jwt.verify(&token).await.unwrap();
        assert_eq!(verified, identity());
    }

    #[test]
    fn test_claims_use_camel_case() {
        let jwt = service();
        let token = jwt.sign_token(&identity()).unwrap();
        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, "user123");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected() {
        let token = service().sign_token(&identity()).unwrap();
        let other = JwtService::new(&JwtConfig {
            secret: "another-secret".to_string(),
            ..JwtConfig::default()
        })
        .unwrap();

        assert!(matches!(
            other.verify(&token).await,
            Err(Error::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let jwt = service();
        let now = Utc::now();
        let claims = Claims {
            user_id: "user123".to_string(),
            username: "alice".to_string(),
            role: "viewer".to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = jwt.verify(&token).await.unwrap_err();
        assert_eq!(err.to_string(), "Authentication error: Token expired");
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_role() {
        let jwt = service();
        assert!(jwt.verify("not-a-jwt").await.is_err());

        let claims = Claims {
            user_id: "u".to_string(),
            username: "u".to_string(),
            role: "root".to_string(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(matches!(jwt.verify(&token).await, Err(Error::Authentication(_))));
    }

    #[test]
    fn test_empty_secret_is_refused() {
        let config = JwtConfig {
            secret: String::new(),
            ..JwtConfig::default()
        };
        assert!(JwtService::new(&config).is_err());
    }
}
