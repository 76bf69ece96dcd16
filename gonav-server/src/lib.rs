pub mod error;
pub mod routes;
pub mod routing;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Builds the axum application router. Kept separate from `main` so tests
/// can exercise routes without binding a real TCP listener.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/repo/{*rest}", get(routes::repo::get_repo))
        .route("/api/package/{*rest}", get(routes::package::get_package))
        .route("/api/file/{*rest}", get(routes::file::get_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
