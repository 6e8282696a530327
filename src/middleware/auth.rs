// Authenticated user context extracted from the access token

use serde::{Deserialize, Serialize};

/// Authenticated user information extracted from JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub token_id: String,
    pub email: String,
    pub exp: u64,
}
