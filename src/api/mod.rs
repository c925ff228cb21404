use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, patch, post},
    Router,
};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod email;
pub(crate) mod handlers;
mod openapi;

use handlers::auth::{
    AccountStore, AuthConfig, AuthState, FixedWindowRateLimiter, MemoryAccountStore,
    NoopRateLimiter, PgAccountStore, RateLimiter, TokenCodec,
};

/// Fixed-window budget for the auth endpoints, applied per client key.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_seconds: u64,
}

/// Build the API router with all routes registered.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::health::health))
        .route("/v1/auth/register", post(handlers::auth::register::register))
        .route("/v1/auth/login", post(handlers::auth::login::login))
        .route("/v1/auth/logout", post(handlers::auth::session::logout))
        .route(
            "/v1/auth/verify-email",
            post(handlers::auth::verification::verify_email),
        )
        .route(
            "/v1/auth/resend-verification",
            post(handlers::auth::verification::resend_verification),
        )
        .route(
            "/v1/auth/forgot-password",
            post(handlers::auth::reset::forgot_password),
        )
        .route(
            "/v1/auth/reset-password",
            post(handlers::auth::reset::reset_password),
        )
        .route(
            "/v1/auth/password",
            patch(handlers::auth::account::update_password),
        )
        .route(
            "/v1/auth/me",
            get(handlers::auth::account::me).delete(handlers::auth::account::delete_me),
        )
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
}

/// Start the server.
///
/// Without a DSN the service falls back to the ephemeral in-memory store,
/// which is only suitable for local development.
///
/// # Errors
/// Returns an error if the database connection or the listener fails.
pub async fn new(
    port: u16,
    dsn: Option<String>,
    auth_config: AuthConfig,
    token_secret: &SecretString,
    rate_limit: RateLimitSettings,
) -> Result<()> {
    let store: Arc<dyn AccountStore> = match dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(&dsn)
                .await
                .context("Failed to connect to database")?;
            Arc::new(PgAccountStore::new(pool))
        }
        None => {
            warn!("no DSN configured; using the ephemeral in-memory account store");
            Arc::new(MemoryAccountStore::new())
        }
    };

    let rate_limiter: Arc<dyn RateLimiter> = if rate_limit.max_requests == 0 {
        Arc::new(NoopRateLimiter)
    } else {
        Arc::new(FixedWindowRateLimiter::new(
            rate_limit.max_requests,
            Duration::from_secs(rate_limit.window_seconds),
        ))
    };

    // The signing key lives inside the codec for the whole process; it is
    // constructed here once and never rotated mid-process.
    let tokens = TokenCodec::new(token_secret, auth_config.session_ttl_seconds());
    let auth_state = Arc::new(AuthState::new(auth_config, tokens, rate_limiter));

    let sender: Arc<dyn email::MessageSender> = Arc::new(email::LogMessageSender);

    let frontend_origin = frontend_origin(auth_state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &Request<Body>| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(auth_state))
            .layer(Extension(store))
            .layer(Extension(sender)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
