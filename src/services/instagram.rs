// Instagram integration service - business logic layer
// Connect (multi-stage OAuth), on-demand token refresh, two-phase media
// publish with an idempotency claim, and caller-scoped connection status.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    app::AppState,
    db::DieselPool,
    models::{
        company_profile::{CompanyProfile, InstagramCredentials},
        scheduled_post::{PostStatus, ScheduledPost},
    },
    services::graph_api::{translate_graph_error, GraphApiClient, GraphApiError},
    utils::instagram_errors::InstagramError,
};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Token prefixes issued by the Instagram Basic Display API. Those tokens
/// cannot publish through the Graph API; rejecting them up front produces an
/// actionable message instead of an opaque upstream failure. Heuristic only.
const KNOWN_BASIC_DISPLAY_PREFIXES: &[&str] = &["IGQV", "IGAA"];

/// Graph API page/user tokens are long opaque strings; anything shorter than
/// this is not a plausible token. Heuristic only.
const MIN_GRAPH_TOKEN_LENGTH: usize = 50;

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Outcome of a successful connect flow
#[derive(Debug, Clone)]
pub struct ConnectedAccount {
    pub instagram_user_id: String,
    pub instagram_username: Option<String>,
    pub facebook_page_id: String,
    pub facebook_page_name: Option<String>,
    pub token_expires_at: DateTime<Utc>,
}

/// Outcome of a successful token refresh
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub token_expires_at: DateTime<Utc>,
}

/// Outcome of a successful publish
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub media_id: String,
}

/// Connection status for the authenticated caller
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub instagram_user_id: Option<String>,
    pub username: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Caption sent to the Graph API: post caption, a blank line, then the
/// hashtags space-joined. Posts without hashtags get the caption alone.
pub fn build_publish_caption(caption: &str, hashtags: &[String]) -> String {
    let tags = hashtags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if tags.is_empty() {
        caption.to_string()
    } else {
        format!("{}\n\n{}", caption, tags)
    }
}

/// Heuristic guards on the stored token, checked before any network call.
/// Prefix check first (wrong API family), then minimum length.
fn validate_token_shape(token: &str) -> Result<(), InstagramError> {
    for prefix in KNOWN_BASIC_DISPLAY_PREFIXES {
        if token.starts_with(prefix) {
            return Err(InstagramError::WrongTokenType);
        }
    }

    if token.len() < MIN_GRAPH_TOKEN_LENGTH {
        return Err(InstagramError::TokenMalformed);
    }

    Ok(())
}

fn expiry_from_now(expires_in_secs: u64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(expires_in_secs as i64)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Refresh failures where the Graph API rejected the stored token become
/// RefreshRejected (the user must fully reconnect, not refresh again)
fn translate_refresh_error(err: &GraphApiError) -> InstagramError {
    match translate_graph_error(err) {
        InstagramError::ReauthorizationRequired => InstagramError::RefreshRejected,
        other => other,
    }
}

// =============================================================================
// INSTAGRAM SERVICE
// =============================================================================

pub struct InstagramService {
    diesel_pool: DieselPool,
    graph: GraphApiClient,
}

impl InstagramService {
    /// Create a new InstagramService instance
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
            graph: GraphApiClient::from_config(),
        }
    }

    /// Create a service with an explicit Graph client (tests point this at a
    /// stub server)
    pub fn with_graph_client(diesel_pool: DieselPool, graph: GraphApiClient) -> Self {
        Self { diesel_pool, graph }
    }

    /// Connect the caller's Instagram Business account.
    ///
    /// Strictly sequential: code -> short-lived user token -> first Facebook
    /// Page -> linked Instagram Business Account -> username (best-effort) ->
    /// long-lived token. Exactly one upsert happens at the end; any failure
    /// aborts before credentials are persisted.
    pub async fn connect_account(
        &self,
        user: Uuid,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ConnectedAccount, InstagramError> {
        // Step 1: exchange the OAuth code for a short-lived user token
        let user_token = self
            .graph
            .exchange_code(code, redirect_uri)
            .await
            .map_err(|e| translate_graph_error(&e))?;

        // Step 2: list the user's Facebook Pages
        let pages = self
            .graph
            .list_pages(&user_token)
            .await
            .map_err(|e| translate_graph_error(&e))?;

        // Step 3: take the first page (no disambiguation UI)
        let page = pages.into_iter().next().ok_or(InstagramError::NoPagesFound)?;

        // Step 4: resolve the linked Instagram Business Account
        let instagram_user_id = self
            .graph
            .instagram_business_account(&page.id, &page.access_token)
            .await
            .map_err(|e| translate_graph_error(&e))?
            .ok_or(InstagramError::NoInstagramBusinessAccount)?;

        // Step 5: resolve the username; failure here is non-fatal
        let instagram_username = match self
            .graph
            .fetch_username(&instagram_user_id, &page.access_token)
            .await
        {
            Ok(username) => username,
            Err(e) => {
                warn!("Username lookup failed during connect: {}", e);
                None
            },
        };

        // Step 6: exchange the page token for a long-lived token
        let long_lived = self
            .graph
            .exchange_long_lived_token(&page.access_token)
            .await
            .map_err(|e| translate_graph_error(&e))?;

        let token_expires_at = expiry_from_now(long_lived.expires_in_secs);

        // Single upsert - nothing was persisted before this point
        let mut conn = self
            .diesel_pool
            .get()
            .await
            .map_err(|e| InstagramError::Database(e.to_string()))?;

        CompanyProfile::upsert_instagram_credentials(
            &mut conn,
            user,
            InstagramCredentials {
                access_token: long_lived.access_token,
                instagram_user_id: instagram_user_id.clone(),
                facebook_page_id: page.id.clone(),
                instagram_username: instagram_username.clone(),
                token_expires_at,
            },
        )
        .await?;

        info!(
            user_id = %user,
            instagram_user_id = %instagram_user_id,
            "Instagram account connected"
        );

        Ok(ConnectedAccount {
            instagram_user_id,
            instagram_username,
            facebook_page_id: page.id,
            facebook_page_name: page.name,
            token_expires_at,
        })
    }

    /// Exchange the stored long-lived token for a renewed one.
    /// Long-lived tokens cannot be refreshed once expired, which is why the
    /// background sweep calls this ahead of expiry.
    pub async fn refresh_token(&self, user: Uuid) -> Result<RefreshedToken, InstagramError> {
        let mut conn = self
            .diesel_pool
            .get()
            .await
            .map_err(|e| InstagramError::Database(e.to_string()))?;

        let profile = CompanyProfile::find_by_user(&mut conn, user)
            .await?
            .ok_or(InstagramError::TokenMissing)?;

        let current_token =
            non_empty(profile.instagram_access_token).ok_or(InstagramError::TokenMissing)?;

        let long_lived = self
            .graph
            .exchange_long_lived_token(&current_token)
            .await
            .map_err(|e| translate_refresh_error(&e))?;

        let token_expires_at = expiry_from_now(long_lived.expires_in_secs);

        CompanyProfile::update_refreshed_token(
            &mut conn,
            user,
            &long_lived.access_token,
            token_expires_at,
        )
        .await?;

        info!(user_id = %user, expires_at = %token_expires_at, "Instagram token refreshed");

        Ok(RefreshedToken { token_expires_at })
    }

    /// Publish a scheduled post through the two-phase Graph protocol.
    ///
    /// Preconditions in order: post exists for the caller, credentials are
    /// stored, token passes the shape heuristics. The row is then claimed
    /// with a conditional status update so concurrent or repeated publish
    /// requests cannot double-submit to the Graph API.
    pub async fn publish_scheduled_post(
        &self,
        user: Uuid,
        scheduled_post_id: Uuid,
    ) -> Result<PublishOutcome, InstagramError> {
        let mut conn = self
            .diesel_pool
            .get()
            .await
            .map_err(|e| InstagramError::Database(e.to_string()))?;

        // Precondition 1: the scheduled post (with its content) exists
        let (scheduled, generated) =
            ScheduledPost::find_with_post_for_user(&mut conn, scheduled_post_id, user).await?;

        // Precondition 2: stored credentials
        let profile = CompanyProfile::find_by_user(&mut conn, user)
            .await?
            .ok_or(InstagramError::InstagramNotConnected)?;

        let token = non_empty(profile.instagram_access_token)
            .ok_or(InstagramError::InstagramNotConnected)?;
        let instagram_user_id = non_empty(profile.instagram_user_id)
            .ok_or(InstagramError::InstagramNotConnected)?;

        // Precondition 3: heuristic token guards
        validate_token_shape(&token)?;

        let image_url = non_empty(generated.image_url.clone())
            .ok_or(InstagramError::MissingImage)?;

        // Refuse terminal/in-flight states before attempting the claim
        match scheduled.status_enum() {
            Ok(PostStatus::Published) => return Err(InstagramError::AlreadyPublished),
            Ok(PostStatus::Publishing) => return Err(InstagramError::PublishInFlight),
            _ => {},
        }

        // Claim the row: scheduled|failed -> publishing. Losing the race
        // means another request is publishing (or already published) it.
        if !ScheduledPost::claim_for_publish(&mut conn, scheduled.id).await? {
            let (current, _) =
                ScheduledPost::find_with_post_for_user(&mut conn, scheduled_post_id, user).await?;
            return Err(match current.status_enum() {
                Ok(PostStatus::Published) => InstagramError::AlreadyPublished,
                _ => InstagramError::PublishInFlight,
            });
        }

        // Diagnostic image probe; its outcome never gates the flow
        self.graph.probe_image_url(&image_url).await;

        let caption = build_publish_caption(&generated.caption, &generated.hashtags);

        match self
            .run_publish_protocol(&instagram_user_id, &token, &image_url, &caption)
            .await
        {
            Ok(media_id) => {
                ScheduledPost::mark_published(&mut conn, scheduled.id, &media_id).await?;
                info!(
                    user_id = %user,
                    scheduled_post_id = %scheduled.id,
                    media_id = %media_id,
                    "Scheduled post published"
                );
                Ok(PublishOutcome { media_id })
            },
            Err(e) => {
                // Record the failure so stale claims cannot linger; the post
                // stays claimable for an explicit caller retry
                if let Err(mark_err) =
                    ScheduledPost::mark_failed(&mut conn, scheduled.id, &e.user_message()).await
                {
                    tracing::error!(
                        "Failed to record publish failure for {}: {}",
                        scheduled.id,
                        mark_err
                    );
                }
                Err(e)
            },
        }
    }

    /// The two Graph round-trips: create the media container, then publish
    /// it. No local transaction spans them.
    async fn run_publish_protocol(
        &self,
        instagram_user_id: &str,
        token: &str,
        image_url: &str,
        caption: &str,
    ) -> Result<String, InstagramError> {
        let creation_id = self
            .graph
            .create_media_container(instagram_user_id, token, image_url, caption)
            .await
            .map_err(|e| translate_graph_error(&e))?;

        let media_id = self
            .graph
            .publish_media_container(instagram_user_id, token, &creation_id)
            .await
            .map_err(|e| translate_graph_error(&e))?;

        Ok(media_id)
    }

    /// Connection status for the authenticated caller only - no fallback to
    /// other profiles. Username lookup is best-effort and silent on failure.
    pub async fn connection_status(&self, user: Uuid) -> Result<ConnectionStatus, InstagramError> {
        let mut conn = self
            .diesel_pool
            .get()
            .await
            .map_err(|e| InstagramError::Database(e.to_string()))?;

        let profile = match CompanyProfile::find_by_user(&mut conn, user).await? {
            Some(profile) => profile,
            None => return Ok(ConnectionStatus::default()),
        };

        let connected = profile.has_instagram_connection();
        let mut username = non_empty(profile.instagram_username.clone());

        if connected && username.is_none() {
            if let (Some(token), Some(ig_id)) = (
                profile.instagram_access_token.as_deref(),
                profile.instagram_user_id.as_deref(),
            ) {
                match self.graph.fetch_username(ig_id, token).await {
                    Ok(Some(name)) => username = Some(name),
                    Ok(None) => {},
                    Err(e) => debug!("Username lookup failed for status: {}", e),
                }
            }
        }

        Ok(ConnectionStatus {
            connected,
            instagram_user_id: profile.instagram_user_id,
            username,
            token_expires_at: profile.token_expires_at,
        })
    }

    /// Proactive refresh sweep used by the background task: refresh every
    /// connected profile whose token expires before the configured lead
    /// window. Individual failures are logged and skipped.
    pub async fn refresh_expiring_tokens(&self) -> Result<usize, InstagramError> {
        let lead_days = crate::app_config::config().instagram.token_refresh_lead_days;
        let cutoff = Utc::now() + Duration::days(lead_days);

        let expiring = {
            let mut conn = self
                .diesel_pool
                .get()
                .await
                .map_err(|e| InstagramError::Database(e.to_string()))?;
            CompanyProfile::find_expiring(&mut conn, cutoff).await?
        };

        let mut refreshed = 0;
        for profile in expiring {
            match self.refresh_token(profile.user_id).await {
                Ok(renewed) => {
                    refreshed += 1;
                    debug!(
                        user_id = %profile.user_id,
                        expires_at = %renewed.token_expires_at,
                        "Proactively refreshed Instagram token"
                    );
                },
                Err(e) => {
                    warn!(
                        "Proactive token refresh failed for user {}: {}",
                        profile.user_id, e
                    );
                },
            }
        }

        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_publish_caption_with_hashtags() {
        let caption = build_publish_caption(
            "Novidades chegando na loja!",
            &["#moda".to_string(), "#promo".to_string()],
        );
        assert_eq!(caption, "Novidades chegando na loja!\n\n#moda #promo");
    }

    #[test]
    fn test_build_publish_caption_without_hashtags() {
        assert_eq!(build_publish_caption("Só a legenda", &[]), "Só a legenda");
    }

    #[test]
    fn test_build_publish_caption_skips_blank_hashtags() {
        let caption = build_publish_caption(
            "Legenda",
            &["".to_string(), "  ".to_string(), "#tag".to_string()],
        );
        assert_eq!(caption, "Legenda\n\n#tag");
    }

    #[test]
    fn test_validate_token_shape_rejects_basic_display_prefix() {
        // Prefix check wins even when the token is long enough
        let token = format!("IGQV{}", "x".repeat(80));
        assert!(matches!(
            validate_token_shape(&token),
            Err(InstagramError::WrongTokenType)
        ));
        let token = format!("IGAA{}", "x".repeat(80));
        assert!(matches!(
            validate_token_shape(&token),
            Err(InstagramError::WrongTokenType)
        ));
    }

    #[test]
    fn test_validate_token_shape_rejects_short_token() {
        assert!(matches!(
            validate_token_shape("EAAGshort"),
            Err(InstagramError::TokenMalformed)
        ));
    }

    #[test]
    fn test_validate_token_shape_accepts_plausible_token() {
        let token = format!("EAAG{}", "b".repeat(120));
        assert!(validate_token_shape(&token).is_ok());
    }

    #[test]
    fn test_expiry_from_now_long_lived_window() {
        let expires_at = expiry_from_now(5_184_000);
        let delta = expires_at - Utc::now();
        // ~60 days, allowing for test execution time
        assert!(delta > Duration::days(59));
        assert!(delta <= Duration::days(60));
    }

    #[test]
    fn test_translate_refresh_error_maps_bad_token_to_rejected() {
        let err = GraphApiError::Api {
            code: Some(190),
            subcode: None,
            message: "Error validating access token: session has expired".to_string(),
        };
        assert!(matches!(
            translate_refresh_error(&err),
            InstagramError::RefreshRejected
        ));
    }
}
