// Authentication Handlers for PostPilot Backend
// Register, login and current-user endpoints backing the dashboard session

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::user::{NewUser, User, UserError},
    utils::{hash_password, trim_and_validate_field, trim_optional_field, verify_password},
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    #[validate(custom(function = "validate_password"))]
    pub password: String,

    pub password_confirmation: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Full name must be between 1 and 255 characters"
    ))]
    pub full_name: String,

    #[validate(length(max = 255, message = "Company name must be less than 255 characters"))]
    pub company_name: Option<String>,
}

/// Custom password validation - min 8 chars, must have uppercase, lowercase, number, special char
fn validate_password(password: &str) -> Result<(), validator::ValidationError> {
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if password.len() < 8 {
        return Err(validator::ValidationError::new("password_too_short"));
    }

    if !has_uppercase || !has_lowercase || !has_digit || !has_special {
        return Err(validator::ValidationError::new("password_complexity"));
    }

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
    pub user: LoginUserInfo,
}

#[derive(Debug, Serialize)]
pub struct LoginUserInfo {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub company_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub company_name: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub company_name: Option<String>,
}

fn auth_error<T: Serialize>(status: StatusCode, message: &str) -> axum::response::Response {
    let response = AuthResponse::<T> {
        success: false,
        data: None,
        message: message.to_string(),
    };
    (status, Json(response)).into_response()
}

// =============================================================================
// AUTHENTICATION HANDLERS
// =============================================================================

/// POST /auth/register - Register a new user account
pub async fn register(
    State(state): State<AppState>,
    Json(register_req): Json<RegisterRequest>,
) -> impl IntoResponse {
    // Step 1: Validate request
    if let Err(validation_errors) = register_req.validate() {
        let error_messages: Vec<String> = validation_errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();

        return auth_error::<RegisterResponse>(
            StatusCode::BAD_REQUEST,
            &error_messages.join(", "),
        );
    }

    // Validate password confirmation matches
    if register_req.password != register_req.password_confirmation {
        return auth_error::<RegisterResponse>(StatusCode::BAD_REQUEST, "Passwords do not match");
    }

    // Step 2: Check email uniqueness
    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return auth_error::<RegisterResponse>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database connection error",
            );
        },
    };

    match User::find_by_email(&mut conn, &register_req.email).await {
        Ok(_existing_user) => {
            return auth_error::<RegisterResponse>(
                StatusCode::CONFLICT,
                "An account with this email address already exists",
            );
        },
        Err(UserError::NotFound) => {
            // Good, email doesn't exist
        },
        Err(e) => {
            tracing::error!("Error checking email uniqueness: {}", e);
            return auth_error::<RegisterResponse>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to check email availability",
            );
        },
    }

    // Step 3: Hash the password using Argon2
    let password_hash = match hash_password(&register_req.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            return auth_error::<RegisterResponse>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process password",
            );
        },
    };

    // Validate and trim full_name
    let full_name = match trim_and_validate_field(&register_req.full_name, true) {
        Ok(name) => name,
        Err(_) => {
            return auth_error::<RegisterResponse>(
                StatusCode::BAD_REQUEST,
                "Full name cannot be empty",
            );
        },
    };

    let company_name = trim_optional_field(register_req.company_name.as_ref());

    // Step 4: Create new user in database
    let new_user = NewUser {
        email: register_req.email.to_lowercase(),
        password_hash,
        full_name,
        company_name,
    };

    let created_user = match User::create(&mut conn, new_user).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to create user: {}", e);
            return auth_error::<RegisterResponse>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create user account",
            );
        },
    };

    let register_response = RegisterResponse {
        user_id: created_user.id.to_string(),
        email: created_user.email.clone(),
        full_name: created_user.full_name.clone(),
        company_name: created_user.company_name.clone(),
        message: "Registration successful! You can now log in.".to_string(),
    };

    let response = AuthResponse {
        success: true,
        data: Some(register_response),
        message: "User registered successfully".to_string(),
    };

    tracing::info!("New user registered: {}", created_user.email);
    (StatusCode::CREATED, Json(response)).into_response()
}

/// POST /auth/login - Authenticate user and return an access token
pub async fn login(
    State(state): State<AppState>,
    Json(login_req): Json<LoginRequest>,
) -> impl IntoResponse {
    // Step 1: Validate email format
    let email = login_req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return auth_error::<LoginResponse>(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    // Step 2: Get user from database
    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return auth_error::<LoginResponse>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database connection error",
            );
        },
    };

    let user = match User::find_by_email(&mut conn, &email).await {
        Ok(user) => user,
        Err(UserError::NotFound) => {
            return auth_error::<LoginResponse>(StatusCode::UNAUTHORIZED, "Invalid credentials");
        },
        Err(e) => {
            tracing::error!("Database error during login: {}", e);
            return auth_error::<LoginResponse>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error",
            );
        },
    };

    // Step 3: Check if account is active
    if !user.is_active {
        return auth_error::<LoginResponse>(StatusCode::FORBIDDEN, "Account is inactive");
    }

    // Step 4: Verify password
    match verify_password(&login_req.password, &user.password_hash) {
        Ok(true) => {
            // Password is correct
        },
        Ok(false) => {
            tracing::warn!(email = %email, "Login failed: wrong password");
            return auth_error::<LoginResponse>(StatusCode::UNAUTHORIZED, "Invalid credentials");
        },
        Err(e) => {
            tracing::error!("Password verification error: {}", e);
            return auth_error::<LoginResponse>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            );
        },
    }

    // Step 5: Generate access token
    let access_token = match state
        .jwt_service
        .generate_access_token(&user.id.to_string(), &user.email)
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to generate access token: {}", e);
            return auth_error::<LoginResponse>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Token generation failed",
            );
        },
    };

    let response = AuthResponse {
        success: true,
        data: Some(LoginResponse {
            access_token,
            expires_in: state.jwt_service.access_token_expiry(),
            token_type: "Bearer".to_string(),
            user: LoginUserInfo {
                id: user.id.to_string(),
                email: user.email,
                full_name: user.full_name,
                company_name: user.company_name,
            },
        }),
        message: "Login successful".to_string(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// GET /auth/me - Get current user information
pub async fn get_current_user(
    Extension(user): Extension<AuthenticatedUser>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return auth_error::<UserInfo>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database connection error",
            );
        },
    };

    match User::find_by_email(&mut conn, &user.email).await {
        Ok(db_user) => {
            let user_info = UserInfo {
                user_id: user.user_id,
                email: user.email,
                full_name: db_user.full_name,
                company_name: db_user.company_name,
            };

            let response = AuthResponse {
                success: true,
                data: Some(user_info),
                message: "User info retrieved successfully".to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        },
        Err(e) => {
            tracing::error!("Failed to fetch user from database: {}", e);
            auth_error::<UserInfo>(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch user information",
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_accepts_complex() {
        assert!(validate_password("SecureP@ssw0rd!").is_ok());
    }

    #[test]
    fn test_validate_password_rejects_short() {
        let err = validate_password("S@0a").unwrap_err();
        assert_eq!(err.code, "password_too_short");
    }

    #[test]
    fn test_validate_password_rejects_missing_classes() {
        let err = validate_password("alllowercase1!").unwrap_err();
        assert_eq!(err.code, "password_complexity");

        let err = validate_password("NoDigitsHere!").unwrap_err();
        assert_eq!(err.code, "password_complexity");
    }
}
