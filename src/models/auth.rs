// JWT claim structures

use serde::{Deserialize, Serialize};

/// Claims carried by an access token (HS256)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject - user id
    pub sub: String,
    /// User email
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
    /// Audience
    pub aud: String,
    /// Issuer
    pub iss: String,
    /// Token id
    pub jti: String,
}
