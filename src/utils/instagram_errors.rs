// Instagram integration error handling utilities
// Maps every failure in the connect/refresh/publish/status flows to a wire
// envelope: {"success": false, "error": "<user message>"} with a conventional
// status code. User-facing messages are Portuguese (product locale); Display
// stays English for logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the Instagram connect/refresh/publish/status flows
#[derive(Error, Debug)]
pub enum InstagramError {
    #[error("Missing or invalid caller session")]
    Unauthorized,

    #[error("User has no Facebook Pages")]
    NoPagesFound,

    #[error("Facebook Page has no linked Instagram Business Account")]
    NoInstagramBusinessAccount,

    #[error("No Instagram token stored for user")]
    TokenMissing,

    #[error("Stored token does not look like a Graph API token")]
    TokenMalformed,

    #[error("Stored token is a basic-display-style token")]
    WrongTokenType,

    #[error("Graph API rejected the token refresh")]
    RefreshRejected,

    #[error("Scheduled post not found")]
    ScheduledPostNotFound,

    #[error("Instagram credentials not configured")]
    InstagramNotConnected,

    #[error("Scheduled post already published")]
    AlreadyPublished,

    #[error("Scheduled post publish already in flight")]
    PublishInFlight,

    #[error("Graph API token invalid or expired")]
    ReauthorizationRequired,

    #[error("Token lacks required publish permissions")]
    InsufficientPermissions,

    #[error("Instagram could not download the post image")]
    ImageUnreachable,

    #[error("Scheduled post has no image")]
    MissingImage,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Graph API error: {0}")]
    Graph(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

/// Standard error envelope for the Instagram endpoints
#[derive(Debug, Serialize)]
pub struct InstagramErrorResponse {
    pub success: bool,
    pub error: String,
}

impl InstagramError {
    /// Convert to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            InstagramError::Unauthorized => StatusCode::UNAUTHORIZED,
            InstagramError::ScheduledPostNotFound => StatusCode::NOT_FOUND,
            InstagramError::AlreadyPublished => StatusCode::CONFLICT,
            InstagramError::PublishInFlight => StatusCode::CONFLICT,
            InstagramError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            InstagramError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Convert to error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            InstagramError::Unauthorized => "UNAUTHORIZED",
            InstagramError::NoPagesFound => "NO_PAGES_FOUND",
            InstagramError::NoInstagramBusinessAccount => "NO_INSTAGRAM_BUSINESS_ACCOUNT",
            InstagramError::TokenMissing => "TOKEN_MISSING",
            InstagramError::TokenMalformed => "TOKEN_MALFORMED",
            InstagramError::WrongTokenType => "WRONG_TOKEN_TYPE",
            InstagramError::RefreshRejected => "REFRESH_REJECTED",
            InstagramError::ScheduledPostNotFound => "SCHEDULED_POST_NOT_FOUND",
            InstagramError::InstagramNotConnected => "INSTAGRAM_NOT_CONNECTED",
            InstagramError::AlreadyPublished => "ALREADY_PUBLISHED",
            InstagramError::PublishInFlight => "PUBLISH_IN_FLIGHT",
            InstagramError::ReauthorizationRequired => "REAUTHORIZATION_REQUIRED",
            InstagramError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            InstagramError::ImageUnreachable => "IMAGE_UNREACHABLE",
            InstagramError::MissingImage => "MISSING_IMAGE",
            InstagramError::Validation(_) => "VALIDATION_ERROR",
            InstagramError::Graph(_) => "GRAPH_API_ERROR",
            InstagramError::Database(_) => "DATABASE_ERROR",
            InstagramError::Internal => "INTERNAL_ERROR",
        }
    }

    /// User-facing message for the wire envelope (Portuguese)
    pub fn user_message(&self) -> String {
        match self {
            InstagramError::Unauthorized => {
                "Sessão inválida ou expirada. Faça login novamente.".to_string()
            },
            InstagramError::NoPagesFound => {
                "Nenhuma Página do Facebook encontrada. Crie uma Página do Facebook antes de conectar o Instagram.".to_string()
            },
            InstagramError::NoInstagramBusinessAccount => {
                "A Página do Facebook não possui uma conta Instagram Business vinculada. Vincule uma conta nas configurações da Página.".to_string()
            },
            InstagramError::TokenMissing => {
                "Nenhum token do Instagram armazenado. Conecte sua conta do Instagram em Configurações.".to_string()
            },
            InstagramError::TokenMalformed => {
                "Token do Instagram malformado. Reconecte sua conta do Instagram em Configurações.".to_string()
            },
            InstagramError::WrongTokenType => {
                "O token armazenado é da Instagram Basic Display API e não permite publicação. Reconecte usando uma conta Instagram Business em Configurações.".to_string()
            },
            InstagramError::RefreshRejected => {
                "O Instagram rejeitou a renovação do token. Reconecte sua conta do Instagram em Configurações.".to_string()
            },
            InstagramError::ScheduledPostNotFound => {
                "Post agendado não encontrado.".to_string()
            },
            InstagramError::InstagramNotConnected => {
                "Credenciais do Instagram não configuradas. Conecte sua conta do Instagram em Configurações.".to_string()
            },
            InstagramError::AlreadyPublished => {
                "Este post já foi publicado no Instagram.".to_string()
            },
            InstagramError::PublishInFlight => {
                "Este post já está sendo publicado.".to_string()
            },
            InstagramError::ReauthorizationRequired => {
                "Token do Instagram inválido ou expirado. Reconecte sua conta do Instagram em Configurações.".to_string()
            },
            InstagramError::InsufficientPermissions => {
                "O token do Instagram não possui as permissões necessárias para publicar. Reconecte concedendo as permissões de publicação.".to_string()
            },
            InstagramError::ImageUnreachable => {
                "O Instagram não conseguiu baixar a imagem do post. Verifique se a URL da imagem é pública e acessível.".to_string()
            },
            InstagramError::MissingImage => {
                "O post agendado não possui imagem. Gere uma imagem antes de publicar.".to_string()
            },
            InstagramError::Validation(message) => message.clone(),
            // Upstream message forwarded verbatim when no mapping matched
            InstagramError::Graph(message) => message.clone(),
            InstagramError::Database(_) | InstagramError::Internal => {
                "Erro interno do servidor. Tente novamente mais tarde.".to_string()
            },
        }
    }
}

impl IntoResponse for InstagramError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error_code = self.error_code(), "Instagram flow error: {}", self);
        } else {
            tracing::warn!(error_code = self.error_code(), "Instagram flow error: {}", self);
        }

        let response = InstagramErrorResponse {
            success: false,
            error: self.user_message(),
        };

        (status, Json(response)).into_response()
    }
}

impl From<crate::models::CompanyProfileError> for InstagramError {
    fn from(err: crate::models::CompanyProfileError) -> Self {
        match err {
            crate::models::CompanyProfileError::NotFound => InstagramError::InstagramNotConnected,
            crate::models::CompanyProfileError::Database(e) => {
                InstagramError::Database(e.to_string())
            },
        }
    }
}

impl From<crate::models::ScheduledPostError> for InstagramError {
    fn from(err: crate::models::ScheduledPostError) -> Self {
        match err {
            crate::models::ScheduledPostError::NotFound => InstagramError::ScheduledPostNotFound,
            crate::models::ScheduledPostError::Database(e) => {
                InstagramError::Database(e.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            InstagramError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            InstagramError::InstagramNotConnected.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            InstagramError::ScheduledPostNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            InstagramError::AlreadyPublished.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            InstagramError::Database("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_connected_message_names_settings() {
        let msg = InstagramError::InstagramNotConnected.user_message();
        assert!(msg.starts_with("Credenciais do Instagram não configuradas"));
        assert!(msg.contains("Configurações"));
    }

    #[test]
    fn test_reauthorization_message_mentions_reconnect() {
        let msg = InstagramError::ReauthorizationRequired.user_message();
        assert!(msg.contains("Reconecte"));
        assert!(msg.contains("Configurações"));
    }

    #[test]
    fn test_graph_error_forwards_upstream_message() {
        let msg = InstagramError::Graph("(#100) Unsupported request".to_string()).user_message();
        assert_eq!(msg, "(#100) Unsupported request");
    }
}
