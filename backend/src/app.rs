use std::path::Path;

use axum::{
    http::HeaderName,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{create_todo, delete_todo, get_todo, list_todos, update_todo};
use crate::store::SharedStore;
use crate::telemetry::{request_span, UuidRequestId, REQUEST_ID_HEADER};

/// The `/todos` resource; mounted under `/api` by [`app`].
pub fn api_router(store: SharedStore) -> Router {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .with_state(store)
}

/// Full application: API, built frontend, request ids, tracing and CORS.
pub fn app(store: SharedStore, static_dir: &Path) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/api", api_router(store))
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CorsLayer::permissive()),
        )
}
