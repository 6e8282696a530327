// JWT Token Service
// HS256 access tokens for the dashboard session layer. This product has no
// refresh-token rotation; sessions are re-established by logging in again.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::AccessTokenClaims;

// Error types for JWT operations
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer => JwtError::InvalidToken,
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

// JWT Configuration for access tokens
#[derive(Clone)]
pub struct JwtConfig {
    pub access_token_expiry: u64,
    pub algorithm: Algorithm,
    pub audience: String,
    pub issuer: String,
    pub access_encoding_key: EncodingKey,
    pub access_decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("access_encoding_key", &"<redacted>")
            .field("access_decoding_key", &"<redacted>")
            .finish()
    }
}

impl JwtConfig {
    fn build_from_params(
        access_secret: &str,
        access_expiry: u64,
        audience: String,
        issuer: String,
    ) -> Self {
        JwtConfig {
            access_token_expiry: access_expiry,
            algorithm: Algorithm::HS256,
            audience,
            issuer,
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
        }
    }

    /// Create JWT config from centralized app configuration
    pub fn from_env() -> Result<Self, JwtError> {
        let crate::app_config::JwtConfig {
            access_secret,
            access_expiry,
            audience,
            issuer,
        } = &crate::CONFIG.jwt;

        Ok(Self::build_from_params(
            access_secret,
            *access_expiry,
            audience.clone(),
            issuer.clone(),
        ))
    }

    /// Create JWT config for tests without using the lazy static
    pub fn for_test() -> Self {
        Self::build_from_params(
            "test-access-secret-hs256-postpilot",
            3600,
            "test.postpilot.app".to_string(),
            "test.postpilot.app".to_string(),
        )
    }
}

// JWT service
pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self, JwtError> {
        Ok(Self::new(JwtConfig::from_env()?))
    }

    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Generate a signed access token for a user
    pub fn generate_access_token(&self, user_id: &str, email: &str) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?
            .as_secs();

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.config.access_token_expiry,
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(self.config.algorithm);
        encode(&header, &claims, &self.config.access_encoding_key).map_err(JwtError::from)
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);

        let data = decode::<AccessTokenClaims>(token, &self.config.access_decoding_key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_validate_roundtrip() {
        let service = JwtService::new(JwtConfig::for_test());
        let user_id = Uuid::new_v4().to_string();

        let token = service
            .generate_access_token(&user_id, "ana@example.com")
            .expect("Failed to generate token");

        let claims = service
            .validate_access_token(&token)
            .expect("Failed to validate token");

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.aud, "test.postpilot.app");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = JwtService::new(JwtConfig::for_test());
        assert!(service.validate_access_token("not.a.jwt").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = JwtConfig::for_test();
        let service = JwtService::new(config.clone());

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // Token that expired well beyond the default validation leeway
        let claims = AccessTokenClaims {
            sub: "user".to_string(),
            email: "ana@example.com".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            aud: config.audience.clone(),
            iss: config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(config.algorithm),
            &claims,
            &config.access_encoding_key,
        )
        .unwrap();

        assert!(matches!(
            service.validate_access_token(&token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let service = JwtService::new(JwtConfig::for_test());
        let other = JwtService::new(JwtConfig::build_from_params(
            "test-access-secret-hs256-postpilot",
            3600,
            "other.app".to_string(),
            "other.app".to_string(),
        ));

        let token = other
            .generate_access_token("user", "ana@example.com")
            .unwrap();

        assert!(matches!(
            service.validate_access_token(&token),
            Err(JwtError::InvalidToken)
        ));
    }
}
