//! Maps [`gonav_engine::error::EngineError`] to the HTTP status codes.
//!
//! Only two shapes reach the client as a non-2xx response: a not-yet-fetched
//! (and unfetchable) repository, and a package/file path that does not exist
//! in it. Everything else the engine already degraded into a partial,
//! 200-worthy result before it got here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use gonav_engine::error::EngineError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// A request the gateway rejected before it ever reached the engine:
/// an unparsable `module@version` or an empty path segment.
pub struct BadRequest(pub String);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(ErrorBody { error: self.0 })).into_response()
    }
}

pub struct EngineErrorResponse(pub EngineError);

impl From<EngineError> for EngineErrorResponse {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for EngineErrorResponse {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::RepoNotFetched(_) => StatusCode::NOT_FOUND,
            EngineError::TargetNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Sandbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}
