//! `GET /api/repo/{module@version}`.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::EngineErrorResponse;
use crate::routing::split_module_and_trailing;
use crate::state::AppState;

pub async fn get_repo(State(state): State<AppState>, Path(rest): Path<String>) -> Response {
    let (target, _trailing) = match split_module_and_trailing(&rest) {
        Ok(v) => v,
        Err(bad) => return bad.into_response(),
    };

    match state.engine.ensure_repo(&target).await {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => EngineErrorResponse(e).into_response(),
    }
}
