//! HTTP handlers.

pub mod health;
pub mod render;
pub mod test_props;

pub use health::{health, ready};
pub use render::render_video;
pub use test_props::test_props;

use axum::body::Bytes;
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// Parse a request body the way a JSON body parser would.
///
/// An empty body is an empty object.
pub(crate) fn parse_json_body(body: &Bytes) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}
