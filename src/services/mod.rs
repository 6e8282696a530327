// Services module for PostPilot Backend
// Business logic layer for the application

pub mod background_tasks;
pub mod graph_api;
pub mod instagram;
pub mod jwt;

// Re-export commonly used services
pub use background_tasks::spawn_token_refresh_task;
pub use graph_api::{translate_graph_error, GraphApiClient, GraphApiError, LongLivedToken, PageAccount};
pub use instagram::{
    build_publish_caption, ConnectedAccount, ConnectionStatus, InstagramService, PublishOutcome,
    RefreshedToken,
};
pub use jwt::{JwtConfig, JwtError, JwtService};
