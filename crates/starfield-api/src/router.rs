//! Axum router construction for the HTTP API.
//!
//! Assembles all routes into a single [`Router`] with request counting,
//! CORS for the browser dashboard, and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- general data
/// - `GET /api/ships`, `POST /api/ships` -- list and launch ships
/// - `GET /api/ships/{id}`, `DELETE /api/ships/{id}` -- one ship
/// - `GET /api/space` -- space points
///
/// CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api/ships",
            get(handlers::list_ships).post(handlers::create_ship),
        )
        .route(
            "/api/ships/{id}",
            get(handlers::get_ship).delete(handlers::delete_ship),
        )
        .route("/api/space", get(handlers::list_space_points))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            count_requests,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Count every routed request before handling it.
async fn count_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.record_request();
    next.run(request).await
}
