use std::sync::Arc;

use gonav_engine::Engine;

/// Shared application state handed to every route via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}
