/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use kasir_api::{app::AppState, config::Config};
/// use kasir_shared::db::pool::{create_pool, DatabaseConfig};
/// use kasir_shared::store::postgres::PgStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = kasir_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::get,
    Router,
};
use kasir_shared::{auth::middleware::IdentityVerifier, store::SharedStore};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Record store
    pub store: SharedStore,

    /// Application configuration
    pub config: Arc<Config>,

    /// Identity token verifier
    pub identity: IdentityVerifier,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: SharedStore, config: Config) -> Self {
        let identity =
            IdentityVerifier::new(config.auth.jwt_secret.clone(), config.auth.jwt_issuer.clone());

        Self {
            store,
            config: Arc::new(config),
            identity,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                      # Health check (public)
/// └── /api/                            # Identity token required
///     ├── GET /auth/user               # Current account, provisioned on first call
///     ├── GET|POST /categories
///     ├── GET|PUT|DELETE /categories/:id
///     ├── GET|POST /products
///     └── GET|PUT|DELETE /products/:id
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, compression, tracing, then
/// authentication on `/api`.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let api_routes = Router::new()
        .route("/auth/user", get(routes::auth::current_user))
        .route(
            "/categories",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route(
            "/categories/:id",
            get(routes::categories::get_category)
                .put(routes::categories::update_category)
                .delete(routes::categories::delete_category),
        )
        .route(
            "/products",
            get(routes::products::list_products).post(routes::products::create_product),
        )
        .route(
            "/products/:id",
            get(routes::products::get_product)
                .put(routes::products::update_product)
                .delete(routes::products::delete_product),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            identity_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
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
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Identity authentication layer
///
/// Validates the Bearer token and injects an `AuthContext` into the request
/// extensions.
async fn identity_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = state.identity.authenticate(req.headers())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
