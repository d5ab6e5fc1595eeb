// HTTP boundary: shared state, router assembly, serve loop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::db::Database;
use crate::survey::SurveyService;

pub mod catalog;
pub mod error;
pub mod media;
pub mod survey;
pub mod tiers;

pub use error::ApiError;

/// Shared state handed to every handler.
pub struct AppState {
    pub db: Arc<Database>,
    pub survey: SurveyService,
    pub config: Config,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config) -> Self {
        let survey = SurveyService::new(Arc::clone(&db));
        Self { db, survey, config }
    }

    /// Directory uploads are written to and served from.
    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.uploads.dir)
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let max_body = state.config.uploads.max_file_mb as usize * 1024 * 1024;
    let uploads_dir = state.uploads_dir();

    Router::new()
        .route("/api/survey/submit", post(survey::submit_survey))
        .route("/api/survey/check-voted", post(survey::check_voted))
        .route("/api/survey/stats", get(survey::survey_stats))
        .route("/api/survey/results", get(survey::survey_results))
        .route(
            "/api/characters",
            get(catalog::list_characters).post(catalog::create_character),
        )
        .route(
            "/api/characters/{id}",
            get(catalog::get_character)
                .put(catalog::update_character)
                .delete(catalog::delete_character),
        )
        .route(
            "/api/teams",
            get(catalog::list_teams).post(catalog::create_team),
        )
        .route(
            "/api/teams/{id}",
            get(catalog::get_team)
                .put(catalog::update_team)
                .delete(catalog::delete_team),
        )
        .route("/api/tips", get(catalog::list_tips).post(catalog::create_tip))
        .route(
            "/api/tips/{id}",
            put(catalog::update_tip).delete(catalog::delete_tip),
        )
        .route(
            "/api/events",
            get(catalog::list_events).post(catalog::create_event),
        )
        .route(
            "/api/events/{id}",
            put(catalog::update_event).delete(catalog::delete_event),
        )
        .route("/api/images", get(media::list_images))
        .route("/api/images/{id}", delete(media::delete_image))
        .route("/api/upload-image", post(media::upload_image))
        .route(
            "/api/generation-images",
            get(media::list_generation_images),
        )
        .route(
            "/api/generation-images/{id}",
            delete(media::delete_generation_image),
        )
        .route(
            "/api/upload-generation-image",
            post(media::upload_generation_image),
        )
        .route(
            "/api/upload-character-avatar",
            post(media::upload_character_avatar),
        )
        .route(
            "/api/rankings",
            get(tiers::get_rankings).put(tiers::put_ranking),
        )
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: Config, db: Arc<Database>) -> Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(db, config));
    let app = build_router(Arc::clone(&state));

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("listening on {address}");

    // ConnectInfo carries the peer address into client identity derivation.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        tracing::info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
