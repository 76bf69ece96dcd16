//! `GET /api/package/{module@version}/{package_path}`.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use gonav_common::model::{CachedAnalysisMeta, PackageInfo};
use gonav_engine::cache::AnalysisPayload;

use crate::error::EngineErrorResponse;
use crate::routing::split_module_and_trailing;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RevisionQuery {
    pub revision: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PackageResponseBody {
    #[serde(flatten)]
    pub meta: CachedAnalysisMeta,
    #[serde(flatten)]
    pub package: Option<PackageInfo>,
}

pub async fn get_package(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    Query(query): Query<RevisionQuery>,
) -> Response {
    let (target, package_path) = match split_module_and_trailing(&rest) {
        Ok(v) => v,
        Err(bad) => return bad.into_response(),
    };

    match state
        .engine
        .analyze_package(&target, &package_path, query.revision.as_deref())
        .await
    {
        Ok(response) => {
            let package = match response.payload {
                Some(AnalysisPayload::Package(p)) => Some(p),
                _ => None,
            };
            Json(PackageResponseBody { meta: response.meta, package }).into_response()
        }
        Err(e) => EngineErrorResponse(e).into_response(),
    }
}
