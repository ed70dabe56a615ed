use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::sandbox::{parse_sandbox, ParsedSandbox};

#[derive(Debug, Deserialize)]
pub struct ParseSourceRequest {
    #[serde(default)]
    pub source: String,
}

/// POST /api/sandbox/parse
///
/// Converts raw generator output into the typed file list the preview mounts.
pub async fn handle_parse_source(
    ApiJson(req): ApiJson<ParseSourceRequest>,
) -> Result<Json<ParsedSandbox>, AppError> {
    Ok(Json(parse_sandbox(&req.source)?))
}
