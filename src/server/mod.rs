use crate::config::Config;
use crate::fetch::{Fetcher, HeaderBundle};
use crate::pipeline::MediaPipeline;
use crate::upstream::UpstreamApi;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_api;
pub mod routes_media;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub upstream: Arc<UpstreamApi>,
    pub pipeline: Arc<MediaPipeline>,
}

impl AppContext {
    /// Build the production context from configuration.
    pub fn from_config(config: Config) -> crate::Result<Self> {
        let fetcher = Fetcher::new(config.upstream.request_timeout());
        let upstream = UpstreamApi::new(fetcher, config.upstream.clone());
        let pipeline = MediaPipeline::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            upstream: Arc::new(upstream),
            pipeline: Arc::new(pipeline),
        })
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION, header::CONTENT_LENGTH]);

    // The default span records the full URI, which carries the session cookie.
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http",
            method = %request.method(),
            path = %request.uri().path(),
        )
    });

    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api",
            routes_api::api_routes().merge(routes_media::media_routes()),
        )
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .layer(trace)
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Log every request as `METHOD path args`, with the cookie redacted.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let args = request.uri().query().map(redact_query).unwrap_or_default();

    tracing::info!("{} {} {}", method, path, args);
    let response = next.run(request).await;
    tracing::debug!("{} {} -> {}", method, path, response.status());
    response
}

/// Replace the value of every `cookie` query parameter.
///
/// Keys are compared after form-urlencoded decoding, so `cooki%65=` is
/// caught as well. Other pairs come back re-encoded.
fn redact_query(query: &str) -> String {
    let url = match reqwest::Url::parse(&format!("http://localhost/?{}", query)) {
        Ok(url) => url,
        Err(_) => return "<redacted>".to_string(),
    };

    url.query_pairs()
        .map(|(key, value)| {
            let value = if key.eq_ignore_ascii_case("cookie") {
                "<redacted>".into()
            } else {
                urlencoding::encode(&value)
            };
            format!("{}={}", urlencoding::encode(&key), value)
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Return the value of a required query parameter, treating empty as absent.
pub(crate) fn require<'a>(name: &str, value: &'a Option<String>) -> crate::Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| crate::Error::missing(name))
}

/// Outbound headers for a request: the caller's cookie and user-agent.
pub(crate) fn header_bundle(ctx: &AppContext, cookie: Option<&str>, headers: &HeaderMap) -> HeaderBundle {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    HeaderBundle::new(cookie, user_agent, &ctx.config.upstream)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::from_config(config).context("Failed to initialise pipeline")?;
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
