pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notifier;
pub mod validation;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tracing::error;

use wall_db::Database;

use crate::error::ApiError;
use crate::notifier::Notifier;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub notifier: Arc<dyn Notifier>,
    /// Sender address for outgoing notifications.
    pub from_email: String,
}

impl AppStateInner {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>, from_email: impl Into<String>) -> AppState {
        Arc::new(Self {
            db,
            notifier,
            from_email: from_email.into(),
        })
    }
}

/// All API routes. Every request passes through identity resolution first.
pub fn router(state: AppState) -> Router {
    auth::prepare_dummy_hash();

    Router::new()
        .route("/api/auth/registration/", post(auth::register))
        .route("/api/auth/login/", post(auth::login))
        .route("/api/auth/logout/", post(auth::logout))
        .route("/api/auth/user/", get(auth::current_user))
        .route(
            "/api/messages/",
            get(messages::list_messages).post(messages::create_message),
        )
        .layer(from_fn_with_state(state.clone(), middleware::resolve_identity))
        .with_state(state)
}

/// Run blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
    })?
}
