//! # cutout: Background Removal Service
//!
//! `cutout` is a small HTTP service that accepts an uploaded image, forwards it to an
//! external background-removal model, and returns the processed image. It implements no
//! image processing of its own: segmentation belongs entirely to the model behind the
//! [`removal::BackgroundRemover`] seam, and this crate is the glue around it — request
//! parsing, artifact persistence, content negotiation, and response formatting.
//!
//! ## Request Flow
//!
//! A `POST /api/remove-background` request carries a multipart `image` field. The handler
//! validates that the field is present and carries a filename, persists the uploaded bytes
//! under a generated UUID in the upload directory, reads them back, invokes the removal
//! capability, persists the returned PNG under a second UUID in the result directory, and
//! serves it from disk. Browser clients (those whose `Accept` header includes `text/html`)
//! receive the image inline; API clients receive it as an attachment named `result.png`.
//!
//! Every request operates on its own uniquely named artifact pair, so concurrent requests
//! share nothing but the two directories. There is no cancellation, timeout, or retry: a
//! request runs to completion or fails through the closed error enumeration in [`errors`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use cutout::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = cutout::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     cutout::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options (bind address, storage
//! directories, artifact retention, upstream model endpoint).

pub mod api;
pub mod config;
pub mod errors;
pub mod removal;
pub mod storage;
pub mod telemetry;

use crate::removal::{BackgroundRemover, HttpRemover};
use crate::storage::ArtifactStore;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};

/// Application state shared across all request handlers.
///
/// Cheap to clone: configuration and the artifact store are plain data, the
/// removal capability sits behind an `Arc` so tests can swap in a stub.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub store: ArtifactStore,
    pub remover: Arc<dyn BackgroundRemover>,
}

/// Build the service router on top of the given state.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.limits.max_upload_bytes;

    Router::new()
        .route("/", get(api::handlers::landing::index))
        .route("/healthz", get(|| async { "OK" }))
        .route(
            "/api/remove-background",
            post(api::handlers::images::remove_background).layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// The assembled application.
///
/// 1. **Create**: [`Application::new`] creates the artifact directories and
///    wires the production remover into the router
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting background removal service with configuration: {:#?}", config);

        let store = ArtifactStore::open(config.storage.upload_dir.clone(), config.storage.result_dir.clone())
            .await
            .context("failed to create artifact directories")?;

        let remover: Arc<dyn BackgroundRemover> = Arc::new(HttpRemover::new(&config.removal));

        let state = AppState::builder()
            .config(config.clone())
            .store(store)
            .remover(remover)
            .build();

        let router = build_router(state);

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Background removal service listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
