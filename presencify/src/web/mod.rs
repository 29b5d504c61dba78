//! HTTP front end.
//!
//! Every page is rendered on the server:
//! - Public pages: landing, pricing (add-on selector), contact
//! - Auth page: sign in, sign up, sign out
//! - Portals: client projects, admin dashboard

pub mod auth;
pub mod portal;
pub mod public;
pub mod session;
pub mod templates;

use crate::config::{Config, SiteConfig};
use crate::store::SharedBackend;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use self::session::SetCookies;
use self::templates::{Layout, MessageTemplate, render};

const SITE_CSS: &str = include_str!("../../assets/site.css");

/// State shared by all handlers.
pub struct AppState {
    pub backend: SharedBackend,
    pub site: SiteConfig,
    pub session_timeout_secs: u64,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(backend: SharedBackend, config: &Config) -> Self {
        Self {
            backend,
            site: config.site.clone(),
            session_timeout_secs: config.session.timeout_secs,
            secure_cookies: config.server.secure_cookies,
        }
    }
}

/// Build the site router.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(public::landing))
        .route("/pricing", get(public::pricing))
        .route("/pricing/quote", post(public::quote))
        .route(
            "/contact",
            get(public::contact_page).post(public::contact_submit),
        )
        .route("/auth", get(auth::auth_page))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/signup", post(auth::sign_up))
        .route("/signout", post(auth::sign_out))
        .route("/client", get(portal::client))
        .route("/admin", get(portal::admin))
        .route("/assets/site.css", get(stylesheet))
        .route("/healthz", get(healthz))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the site until Ctrl-C.
pub async fn run_server(listen_addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;

    info!("Listening on http://{}", listen_addr);

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn stylesheet() -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        SITE_CSS,
    )
        .into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

async fn not_found() -> Response {
    let template = MessageTemplate {
        layout: Layout::new("", "Not Found"),
        heading: "Page not found",
        detail: "The page you're looking for doesn't exist.",
        link_href: "/",
        link_label: "Back to Home",
    };
    session::page(StatusCode::NOT_FOUND, render(&template), SetCookies::new())
}
