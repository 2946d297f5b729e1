//! # REST API HTTP Server
//!
//! Axum routes for every configured collection.
//!
//! ```text
//! POST   /:collection                       create
//! GET    /:collection                       list
//! GET    /:collection/:id                   read
//! PUT    /:collection/:id                   update
//! DELETE /:collection/:id                   destroy
//! GET    /:collection/:id/:association      children
//! GET    /health                            liveness
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::store::RecordStore;

use super::errors::RestError;
use super::handler::{HandledRequest, Operation, Payload, ResourceHandler, ResourceRequest};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// REST API server state
pub struct RestServer {
    handler: ResourceHandler,
    cors_origins: Vec<String>,
}

/// Shared state type
type ServerState = Arc<RestServer>;

impl RestServer {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            handler: ResourceHandler::new(store),
            cors_origins: Vec::new(),
        }
    }

    /// Restrict CORS to the given origins. Empty allows any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Build the Axum router
    pub fn router(self) -> Router {
        let cors = cors_layer(&self.cors_origins);
        let state = Arc::new(self);

        Router::new()
            .route("/health", get(health_handler))
            .route("/:collection", get(list_handler).post(create_handler))
            .route(
                "/:collection/:id",
                get(read_handler).put(update_handler).delete(destroy_handler),
            )
            .route("/:collection/:id/:association", get(children_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Serve until ctrl-c.
    pub async fn start(self, addr: SocketAddr) -> Result<(), std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

impl IntoResponse for HandledRequest {
    fn into_response(self) -> Response {
        let mut response = match self.result {
            Ok(payload @ Payload::Created(_)) => (StatusCode::CREATED, Json(payload)).into_response(),
            Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
            Err(err) => err.into_response(),
        };

        if let Ok(value) = HeaderValue::from_str(&self.request_id.to_string()) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        response
    }
}

fn dispatch(server: &RestServer, collection: String, operation: Operation) -> HandledRequest {
    server.handler.handle(ResourceRequest::new(collection, operation))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, RestError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| RestError::InvalidBody(rejection.body_text()))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// List records handler
async fn list_handler(
    State(server): State<ServerState>,
    Path(collection): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> HandledRequest {
    dispatch(&server, collection, Operation::List { query })
}

/// Insert record handler
async fn create_handler(
    State(server): State<ServerState>,
    Path(collection): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    match json_body(body) {
        Ok(body) => dispatch(&server, collection, Operation::Create { body }).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Get single record handler
async fn read_handler(
    State(server): State<ServerState>,
    Path((collection, id)): Path<(String, String)>,
) -> HandledRequest {
    dispatch(&server, collection, Operation::Read { id })
}

/// Update record handler
async fn update_handler(
    State(server): State<ServerState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    match json_body(body) {
        Ok(body) => dispatch(&server, collection, Operation::Update { id, body }).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Delete record handler
async fn destroy_handler(
    State(server): State<ServerState>,
    Path((collection, id)): Path<(String, String)>,
) -> HandledRequest {
    dispatch(&server, collection, Operation::Destroy { id })
}

/// Child records of one parent through a declared association
async fn children_handler(
    State(server): State<ServerState>,
    Path((collection, id, association)): Path<(String, String, String)>,
    Query(query): Query<Vec<(String, String)>>,
) -> HandledRequest {
    dispatch(
        &server,
        collection,
        Operation::Children {
            id,
            association,
            query,
        },
    )
}
