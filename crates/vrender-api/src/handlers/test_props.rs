//! Props echo endpoint.

use axum::body::Bytes;
use axum::Json;

use vrender_models::TestPropsResponse;

use crate::error::ApiResult;
use crate::handlers::parse_json_body;

/// Echo the request body back, for checking what a client actually sends.
pub async fn test_props(body: Bytes) -> ApiResult<Json<TestPropsResponse>> {
    let received = parse_json_body(&body)?;
    Ok(Json(TestPropsResponse::echo(received)))
}
