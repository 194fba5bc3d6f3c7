//! # gatekeep_api
//!
//! HTTP surface of the Gatekeep identity service, plus the middleware
//! dependent services mount to authenticate and authorize through it.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use gatekeep_core::AuthError;
use gatekeep_core::auth::TokenIssuer;
use gatekeep_core::authz::{Authorizer, LocalAuthorizer, Rule, SubjectOwner};
use gatekeep_core::resets::{ResetBus, ResetStore};
use gatekeep_core::strategy::{
    ApiKeyStrategy, AuthStrategy, BasicStrategy, BearerStrategy, LoginStrategy, RefreshStrategy,
    ResetStrategy,
};
use gatekeep_core::users::cache::{CacheConfig, CachedUserStore};
use gatekeep_core::users::{UserBus, UserStore};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, users};
use crate::middleware::RuleGuard;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub tokens: Arc<TokenIssuer>,
    pub users: Arc<UserBus>,
    pub resets: Arc<ResetBus>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    /// Wire the service from its configuration and backing stores.
    ///
    /// The user store is wrapped in the identity cache unless
    /// `config.user_cache_ttl` is zero.
    pub fn new(
        config: ApiConfig,
        user_store: Arc<dyn UserStore>,
        reset_store: Arc<dyn ResetStore>,
    ) -> Result<Self, AuthError> {
        let tokens = Arc::new(TokenIssuer::new(config.keys.clone(), &config.issuer));
        let kid = tokens.active_kid()?;
        info!(kid, issuer = %config.issuer, "token issuer ready");

        Ok(Self::from_parts(config, tokens, UserBus::new(user_store), reset_store))
    }

    /// Same as [`AppState::new`] with the cache decision made by the caller.
    pub fn from_parts(
        config: ApiConfig,
        tokens: Arc<TokenIssuer>,
        users: UserBus,
        reset_store: Arc<dyn ResetStore>,
    ) -> Self {
        let users = Arc::new(users);
        let resets = Arc::new(ResetBus::new(reset_store, users.clone()));
        Self {
            config,
            tokens,
            users,
            resets,
            authorizer: Arc::new(LocalAuthorizer),
        }
    }
}

/// Put `store` behind the identity cache when `config` enables it.
pub fn cached_user_store<S>(store: S, config: &ApiConfig) -> Arc<dyn UserStore>
where
    S: UserStore + 'static,
{
    if config.user_cache_ttl.is_zero() {
        info!("identity cache disabled");
        return Arc::new(store);
    }
    let cache = CacheConfig {
        ttl: config.user_cache_ttl,
        ..CacheConfig::default()
    };
    Arc::new(CachedUserStore::new(store, cache))
}

/// Run embedded database migrations.
///
/// Delegates to `gatekeep_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    gatekeep_core::migrate::migrate(pool).await
}

fn authenticated<S>(router: Router<AppState>, strategy: S) -> Router<AppState>
where
    S: AuthStrategy + 'static,
{
    middleware::with_strategy(router, Arc::new(strategy))
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let tokens = state.tokens.clone();
    let user_bus = state.users.clone();
    let authorizer = state.authorizer.clone();
    let bearer = || BearerStrategy::new(tokens.clone());

    // Public routes (no strategy)
    let public = Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_FORGOT, post(auth::forgot_handler))
        .route(routes::POST_AUTH_AUTHORIZE, post(auth::authorize_handler));

    let basic = authenticated(
        Router::new().route(routes::GET_AUTH_TOKEN_KID, get(auth::token_handler)),
        BasicStrategy::new(tokens.clone(), user_bus.clone()),
    );
    let login = authenticated(
        Router::new().route(routes::POST_AUTH_LOGIN, post(auth::login_handler)),
        LoginStrategy::new(tokens.clone(), user_bus.clone()),
    );
    let refresh = authenticated(
        Router::new().route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler)),
        RefreshStrategy::new(tokens.clone(), user_bus.clone()),
    );
    let reset = authenticated(
        Router::new().route(
            routes::POST_AUTH_RESET_PASSWORD,
            post(auth::reset_password_handler),
        ),
        ResetStrategy::new(state.resets.clone(), user_bus.clone()),
    );
    let api_key = authenticated(
        Router::new().route(
            routes::GET_AUTH_AUTHENTICATE_API,
            get(auth::authenticate_api_handler),
        ),
        ApiKeyStrategy::new(state.config.api_key.clone()),
    );
    let verified = authenticated(
        Router::new().route(routes::GET_AUTH_AUTHENTICATE, get(auth::authenticate_handler)),
        bearer(),
    );

    // User administration: rule first (inner), strategy outermost.
    let owner = Arc::new(SubjectOwner::new(user_bus.clone()));
    let admin_only = authenticated(
        middleware::with_rule(
            Router::new()
                .route(routes::POST_USERS, post(users::create_user_handler))
                .route(
                    routes::USERS_ID,
                    axum::routing::delete(users::delete_user_handler),
                ),
            RuleGuard::new(authorizer.clone(), Rule::AdminOnly),
        ),
        bearer(),
    );
    let admin_or_subject = authenticated(
        middleware::with_rule(
            Router::new().route(
                routes::USERS_ID,
                get(users::get_user_handler).put(users::update_user_handler),
            ),
            RuleGuard::new(authorizer, Rule::AdminOrSubject)
                .with_owner(routes::USER_ID_PARAM, owner),
        ),
        bearer(),
    );

    Router::new()
        .merge(public)
        .merge(basic)
        .merge(login)
        .merge(refresh)
        .merge(reset)
        .merge(api_key)
        .merge(verified)
        .merge(admin_only)
        .merge(admin_or_subject)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
