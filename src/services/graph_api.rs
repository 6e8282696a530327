// Facebook/Instagram Graph API client
// OAuth code exchanges, page/account resolution, long-lived token exchange
// and the two-phase media publish protocol.
//
// Request encoding: the publish endpoints take URL-encoded query parameters
// on a POST with no body, with access_token as a query parameter. That is a
// property of this Graph API version, not a choice of this service.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::utils::instagram_errors::InstagramError;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum GraphApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Graph API error (code {code:?}): {message}")]
    Api {
        code: Option<i64>,
        subcode: Option<i64>,
        message: String,
    },

    #[error("Unexpected Graph API response: {0}")]
    UnexpectedResponse(String),
}

// =============================================================================
// RESPONSE SHAPES
// =============================================================================

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: String,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error_subcode: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// A Facebook Page with its page-scoped access token
#[derive(Debug, Clone, Deserialize)]
pub struct PageAccount {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct PageListResponse {
    #[serde(default)]
    data: Vec<PageAccount>,
}

#[derive(Debug, Deserialize)]
struct InstagramAccountField {
    #[serde(default)]
    instagram_business_account: Option<InstagramAccountRef>,
}

#[derive(Debug, Deserialize)]
struct InstagramAccountRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UsernameResponse {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    id: String,
}

/// Long-lived token with its validity window (~60 days)
#[derive(Debug, Clone)]
pub struct LongLivedToken {
    pub access_token: String,
    pub expires_in_secs: u64,
}

/// Default validity the Graph API documents for long-lived tokens, used when
/// the exchange response omits expires_in
pub const DEFAULT_LONG_LIVED_EXPIRY_SECS: u64 = 5_184_000;

// =============================================================================
// ERROR TRANSLATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackKind {
    Reauthorize,
    Permissions,
    ImageUnreachable,
}

/// Last-resort mapping from upstream message substrings to actionable errors.
/// Structured error codes are consulted first; this table exists because the
/// Graph API does not attach a distinct code to every failure it reports.
const MESSAGE_FALLBACKS: &[(&str, FallbackKind)] = &[
    ("Invalid OAuth access token", FallbackKind::Reauthorize),
    ("Error validating access token", FallbackKind::Reauthorize),
    ("Session has expired", FallbackKind::Reauthorize),
    ("permissions", FallbackKind::Permissions),
    ("could not be downloaded", FallbackKind::ImageUnreachable),
];

/// Translate a Graph API failure into the error surfaced to the caller.
/// Structured codes first (190 = bad token, 10/200-299 = permissions), then
/// the message-substring table, otherwise the upstream message verbatim.
pub fn translate_graph_error(err: &GraphApiError) -> InstagramError {
    match err {
        GraphApiError::Api { code, message, .. } => {
            match code {
                Some(190) => return InstagramError::ReauthorizationRequired,
                Some(10) => return InstagramError::InsufficientPermissions,
                Some(c) if (200..=299).contains(c) => {
                    return InstagramError::InsufficientPermissions
                },
                _ => {},
            }

            for (needle, kind) in MESSAGE_FALLBACKS {
                if message.contains(needle) {
                    return match kind {
                        FallbackKind::Reauthorize => InstagramError::ReauthorizationRequired,
                        FallbackKind::Permissions => InstagramError::InsufficientPermissions,
                        FallbackKind::ImageUnreachable => InstagramError::ImageUnreachable,
                    };
                }
            }

            InstagramError::Graph(message.clone())
        },
        GraphApiError::Network(e) => {
            InstagramError::Graph(format!("Falha de comunicação com a Graph API: {}", e))
        },
        GraphApiError::UnexpectedResponse(m) => InstagramError::Graph(m.clone()),
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Parse a Graph API body. Error envelopes can arrive with any status code,
/// so a 2xx body that fails to parse as T is re-checked for an envelope.
fn parse_graph_body<T: DeserializeOwned>(
    status: StatusCode,
    bytes: &[u8],
) -> Result<T, GraphApiError> {
    if !status.is_success() {
        if let Ok(envelope) = serde_json::from_slice::<GraphErrorEnvelope>(bytes) {
            return Err(GraphApiError::Api {
                code: envelope.error.code,
                subcode: envelope.error.error_subcode,
                message: envelope.error.message,
            });
        }
        let body = String::from_utf8_lossy(bytes);
        return Err(GraphApiError::UnexpectedResponse(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body.chars().take(200).collect::<String>()
        )));
    }

    match serde_json::from_slice::<T>(bytes) {
        Ok(value) => Ok(value),
        Err(parse_err) => {
            if let Ok(envelope) = serde_json::from_slice::<GraphErrorEnvelope>(bytes) {
                return Err(GraphApiError::Api {
                    code: envelope.error.code,
                    subcode: envelope.error.error_subcode,
                    message: envelope.error.message,
                });
            }
            Err(GraphApiError::UnexpectedResponse(format!(
                "Failed to parse Graph API response: {}",
                parse_err
            )))
        },
    }
}

// =============================================================================
// GRAPH API CLIENT
// =============================================================================

pub struct GraphApiClient {
    http: reqwest::Client,
    base_url: String,
    oauth_version: String,
    publish_version: String,
    app_id: String,
    app_secret: String,
}

impl GraphApiClient {
    /// Create a client from the global configuration
    pub fn from_config() -> Self {
        let config = &crate::app_config::config().instagram;
        Self::new(
            config.graph_api_base.clone(),
            config.oauth_api_version.clone(),
            config.publish_api_version.clone(),
            config.app_id.clone(),
            config.app_secret.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn new(
        base_url: String,
        oauth_version: String,
        publish_version: String,
        app_id: String,
        app_secret: String,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("PostPilot-Backend/1.0")
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            oauth_version,
            publish_version,
            app_id,
            app_secret,
        }
    }

    fn oauth_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.oauth_version, path)
    }

    fn publish_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.publish_version, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GraphApiError> {
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        parse_graph_body(status, &bytes)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GraphApiError> {
        let response = self.http.post(url).query(query).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        parse_graph_body(status, &bytes)
    }

    /// Exchange an OAuth code for a short-lived user access token
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, GraphApiError> {
        let url = self.oauth_url("oauth/access_token");
        let response: OAuthTokenResponse = self
            .get_json(
                &url,
                &[
                    ("client_id", self.app_id.as_str()),
                    ("client_secret", self.app_secret.as_str()),
                    ("redirect_uri", redirect_uri),
                    ("code", code),
                ],
            )
            .await?;

        Ok(response.access_token)
    }

    /// List the Facebook Pages the user administers, with page-scoped tokens
    pub async fn list_pages(&self, user_token: &str) -> Result<Vec<PageAccount>, GraphApiError> {
        let url = self.oauth_url("me/accounts");
        let response: PageListResponse = self
            .get_json(&url, &[("access_token", user_token)])
            .await?;

        Ok(response.data)
    }

    /// Resolve the Instagram Business Account linked to a Facebook Page
    pub async fn instagram_business_account(
        &self,
        page_id: &str,
        page_token: &str,
    ) -> Result<Option<String>, GraphApiError> {
        let url = self.oauth_url(page_id);
        let response: InstagramAccountField = self
            .get_json(
                &url,
                &[
                    ("fields", "instagram_business_account"),
                    ("access_token", page_token),
                ],
            )
            .await?;

        Ok(response.instagram_business_account.map(|a| a.id))
    }

    /// Look up an Instagram account's username
    pub async fn fetch_username(
        &self,
        instagram_user_id: &str,
        token: &str,
    ) -> Result<Option<String>, GraphApiError> {
        let url = self.oauth_url(instagram_user_id);
        let response: UsernameResponse = self
            .get_json(&url, &[("fields", "username"), ("access_token", token)])
            .await?;

        Ok(response.username)
    }

    /// Exchange a page token for a long-lived (~60 day) token
    pub async fn exchange_long_lived_token(
        &self,
        token: &str,
    ) -> Result<LongLivedToken, GraphApiError> {
        let url = self.oauth_url("oauth/access_token");
        let response: OAuthTokenResponse = self
            .get_json(
                &url,
                &[
                    ("grant_type", "fb_exchange_token"),
                    ("client_id", self.app_id.as_str()),
                    ("client_secret", self.app_secret.as_str()),
                    ("fb_exchange_token", token),
                ],
            )
            .await?;

        Ok(LongLivedToken {
            access_token: response.access_token,
            expires_in_secs: response
                .expires_in
                .unwrap_or(DEFAULT_LONG_LIVED_EXPIRY_SECS),
        })
    }

    /// Phase 1 of the publish protocol: create a staged media container.
    /// Returns the container id ("creation id").
    pub async fn create_media_container(
        &self,
        instagram_user_id: &str,
        token: &str,
        image_url: &str,
        caption: &str,
    ) -> Result<String, GraphApiError> {
        let url = self.publish_url(&format!("{}/media", instagram_user_id));
        let response: MediaResponse = self
            .post_json(
                &url,
                &[
                    ("image_url", image_url),
                    ("caption", caption),
                    ("access_token", token),
                ],
            )
            .await?;

        debug!("Media container created: {}", response.id);
        Ok(response.id)
    }

    /// Phase 2 of the publish protocol: commit a staged container.
    /// Returns the published media id.
    pub async fn publish_media_container(
        &self,
        instagram_user_id: &str,
        token: &str,
        creation_id: &str,
    ) -> Result<String, GraphApiError> {
        let url = self.publish_url(&format!("{}/media_publish", instagram_user_id));
        let response: MediaResponse = self
            .post_json(
                &url,
                &[("creation_id", creation_id), ("access_token", token)],
            )
            .await?;

        Ok(response.id)
    }

    /// Best-effort reachability probe of the post image, purely for
    /// diagnostics. The outcome never gates the publish flow.
    pub async fn probe_image_url(&self, image_url: &str) {
        match self.http.head(image_url).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    debug!("Image URL reachable: {}", image_url);
                } else {
                    warn!(
                        "Image URL probe returned HTTP {} for {}",
                        response.status(),
                        image_url
                    );
                }
            },
            Err(e) => {
                warn!("Image URL probe failed for {}: {}", image_url, e);
            },
        }
    }
}
