// Instagram Integration Handlers
// Connect (OAuth callback), token refresh, connection status and publish.
// Wire fields are camelCase to match the dashboard client.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    services::instagram::InstagramService,
    utils::{instagram_errors::InstagramError, trim_and_validate_field},
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub scheduled_post_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InstagramResponse<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectData {
    pub instagram_user_id: String,
    pub username: Option<String>,
    pub facebook_page_id: String,
    pub facebook_page_name: Option<String>,
    pub token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    pub token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    pub connected: bool,
    pub instagram_user_id: Option<String>,
    pub username: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Publish success envelope: {"success": true, "mediaId": "..."}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub media_id: String,
}

fn caller_uuid(user: &AuthenticatedUser) -> Result<Uuid, InstagramError> {
    Uuid::parse_str(&user.user_id).map_err(|_| InstagramError::Unauthorized)
}

// =============================================================================
// INSTAGRAM HANDLERS
// =============================================================================

/// POST /instagram/connect - complete the OAuth flow and store credentials
pub async fn connect_instagram(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<ConnectRequest>,
) -> impl IntoResponse {
    let user = match caller_uuid(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let code = match trim_and_validate_field(&request.code, true) {
        Ok(code) => code,
        Err(_) => {
            return InstagramError::Validation("O parâmetro code é obrigatório.".to_string())
                .into_response();
        },
    };
    let redirect_uri = match trim_and_validate_field(&request.redirect_uri, true) {
        Ok(uri) => uri,
        Err(_) => {
            return InstagramError::Validation(
                "O parâmetro redirectUri é obrigatório.".to_string(),
            )
            .into_response();
        },
    };

    let service = InstagramService::new(&state);
    match service.connect_account(user, &code, &redirect_uri).await {
        Ok(account) => (
            StatusCode::OK,
            Json(InstagramResponse {
                success: true,
                data: ConnectData {
                    instagram_user_id: account.instagram_user_id,
                    username: account.instagram_username,
                    facebook_page_id: account.facebook_page_id,
                    facebook_page_name: account.facebook_page_name,
                    token_expires_at: account.token_expires_at,
                },
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /instagram/refresh - renew the stored long-lived token
pub async fn refresh_instagram_token(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> impl IntoResponse {
    let user = match caller_uuid(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let service = InstagramService::new(&state);
    match service.refresh_token(user).await {
        Ok(renewed) => (
            StatusCode::OK,
            Json(InstagramResponse {
                success: true,
                data: RefreshData {
                    token_expires_at: renewed.token_expires_at,
                },
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /instagram/status - connection status for the authenticated caller
pub async fn instagram_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> impl IntoResponse {
    let user = match caller_uuid(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let service = InstagramService::new(&state);
    match service.connection_status(user).await {
        Ok(status) => (
            StatusCode::OK,
            Json(InstagramResponse {
                success: true,
                data: StatusData {
                    connected: status.connected,
                    instagram_user_id: status.instagram_user_id,
                    username: status.username,
                    token_expires_at: status.token_expires_at,
                },
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /instagram/publish - publish a scheduled post now
pub async fn publish_scheduled_post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<PublishRequest>,
) -> impl IntoResponse {
    let user = match caller_uuid(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let service = InstagramService::new(&state);
    match service
        .publish_scheduled_post(user, request.scheduled_post_id)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(PublishResponse {
                success: true,
                media_id: outcome.media_id,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_request_accepts_camel_case() {
        let request: ConnectRequest = serde_json::from_str(
            r#"{"code": "abc", "redirectUri": "https://app.postpilot.app/callback"}"#,
        )
        .unwrap();
        assert_eq!(request.code, "abc");
        assert_eq!(request.redirect_uri, "https://app.postpilot.app/callback");
    }

    #[test]
    fn test_publish_request_accepts_camel_case() {
        let id = Uuid::new_v4();
        let request: PublishRequest =
            serde_json::from_str(&format!(r#"{{"scheduledPostId": "{}"}}"#, id)).unwrap();
        assert_eq!(request.scheduled_post_id, id);
    }

    #[test]
    fn test_publish_response_serializes_media_id_camel_case() {
        let response = PublishResponse {
            success: true,
            media_id: "17900001111222233".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["mediaId"], "17900001111222233");
    }

    #[test]
    fn test_caller_uuid_rejects_malformed_subject() {
        let user = AuthenticatedUser {
            user_id: "not-a-uuid".to_string(),
            token_id: "jti".to_string(),
            email: "ana@example.com".to_string(),
            exp: 0,
        };
        assert!(matches!(
            caller_uuid(&user),
            Err(InstagramError::Unauthorized)
        ));
    }
}
