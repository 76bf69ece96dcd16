//! `GET /api/file/{module@version}/{file_path}`.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use gonav_common::model::{CachedAnalysisMeta, FileInfo};
use gonav_engine::cache::AnalysisPayload;

use crate::error::{BadRequest, EngineErrorResponse};
use crate::routes::package::RevisionQuery;
use crate::routing::split_module_and_trailing;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FileResponseBody {
    #[serde(flatten)]
    pub meta: CachedAnalysisMeta,
    #[serde(flatten)]
    pub file: Option<FileInfo>,
}

pub async fn get_file(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    Query(query): Query<RevisionQuery>,
) -> Response {
    let (target, file_path) = match split_module_and_trailing(&rest) {
        Ok(v) => v,
        Err(bad) => return bad.into_response(),
    };
    if file_path.is_empty() {
        return BadRequest("file path must not be empty".to_string()).into_response();
    }

    match state
        .engine
        .analyze_file(&target, &file_path, query.revision.as_deref())
        .await
    {
        Ok(response) => {
            let file = match response.payload {
                Some(AnalysisPayload::File(f)) => Some(f),
                _ => None,
            };
            Json(FileResponseBody { meta: response.meta, file }).into_response()
        }
        Err(e) => EngineErrorResponse(e).into_response(),
    }
}
