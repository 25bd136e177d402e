use serde::{Deserialize, Serialize};

use super::tokens::TokenResponse;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after login. The token is shown exactly once.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub auth_token: TokenResponse,
}
