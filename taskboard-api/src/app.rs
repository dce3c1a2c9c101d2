/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::AppState, config::Config};
/// use taskboard_shared::repository::Repositories;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Repositories::in_memory(), config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::retry::retry_once;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use taskboard_shared::auth::middleware::{authenticate, AuthContext};
use taskboard_shared::repository::Repositories;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler; both fields are reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend behind the repository traits
    pub repos: Repositories,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repos: Repositories, config: Config) -> Self {
        Self {
            repos,
            config: Arc::new(config),
        }
    }

    /// Secret for access token validation
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET /health                          (public)
/// └── /v1                                  (Bearer token)
///     ├── GET|DELETE /me
///     ├── GET|POST   /boards
///     ├── GET|PATCH|DELETE /boards/:id
///     ├── GET        /boards/:id/tasks/pending
///     ├── GET        /boards/:id/tasks/completed
///     ├── POST       /boards/:id/lists
///     ├── GET|PATCH|DELETE /lists/:id
///     ├── PATCH      /lists/:id/move
///     ├── GET|POST   /lists/:id/tasks
///     ├── GET|PATCH|DELETE /tasks/:id
///     ├── PATCH      /tasks/:id/complete
///     └── PATCH      /tasks/:id/snooze
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{boards, health, lists, me, tasks};

    let health_routes = Router::new().route("/health", get(health::health_check));

    let v1_routes = Router::new()
        .route("/me", get(me::get_me).delete(me::delete_me))
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route(
            "/boards/:id",
            get(boards::get_board)
                .patch(boards::rename_board)
                .delete(boards::delete_board),
        )
        .route("/boards/:id/tasks/pending", get(boards::pending_tasks))
        .route("/boards/:id/tasks/completed", get(boards::completed_tasks))
        .route("/boards/:id/lists", post(lists::create_list))
        .route(
            "/lists/:id",
            get(lists::get_list)
                .patch(lists::update_list)
                .delete(lists::delete_list),
        )
        .route("/lists/:id/move", patch(lists::move_list))
        .route("/lists/:id/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/:id/complete", patch(tasks::toggle_complete))
        .route("/tasks/:id/snooze", patch(tasks::snooze_task))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Validates the Bearer token and stores the caller's `AuthContext`
///
/// The token's identity is looked up by its external ID. A first-time
/// caller gets a user row; a returning one has name and email synced.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let identity = authenticate(req.headers(), state.jwt_secret())?;
    let user = retry_once("provision_user", || {
        state.repos.users.find_or_create_by_external_auth_id(identity.clone())
    })
    .await?;
    req.extensions_mut().insert(AuthContext::new(user.id));

    Ok(next.run(req).await)
}
