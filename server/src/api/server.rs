//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use super::auth::{AuthState, require_admin, require_token};
use super::openapi::openapi_json;
use super::routes::{accession, dataset, files, ingest, ready, users};
use crate::broker::Broker;
use crate::core::CoreApp;
use crate::data::FileStore;

/// State shared by every route handler
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<FileStore>,
    pub broker: Arc<Broker>,
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown; returns the CoreApp so the caller can finish
    /// the graceful teardown.
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.api.host.parse()?, app.config.api.port);

        let state = ApiState {
            store: app.store.clone(),
            broker: app.broker.clone(),
        };
        let auth_state = AuthState {
            auth: app.auth.clone(),
        };

        // The submitter-facing listing only needs a valid token.
        let token_routes = Router::new()
            .route("/files", get(files::get_files))
            .layer(axum::middleware::from_fn_with_state(
                auth_state.clone(),
                require_token,
            ))
            .with_state(state.clone());

        // Everything that drives the pipeline requires an admin subject.
        let admin_routes = Router::new()
            .route("/file/ingest", post(ingest::ingest_file))
            .route("/file/accession", post(accession::set_accession))
            .route("/dataset/create", post(dataset::create_dataset))
            .route("/dataset/release", post(dataset::release_dataset_missing))
            .route("/dataset/release/{*dataset}", post(dataset::release_dataset))
            .route("/users", get(users::list_active_users))
            .route("/users/{username}/files", get(users::list_user_files))
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                require_admin,
            ))
            .with_state(state.clone());

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        let router = Router::new()
            .route("/ready", get(ready::ready))
            .route("/openapi.json", get(openapi_json))
            .with_state(state)
            .merge(token_routes)
            .merge(admin_routes)
            .layer(cors);

        tracing::info!(%addr, "Admin API listening");
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
