use apiary_core::ApiaryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};
use tracing::error;

/// Every API answer uses the same `{success, message, data}` envelope.
pub fn ok(data: Value) -> Response {
    (StatusCode::OK, Json(json!({"success": true, "data": data}))).into_response()
}

pub fn ok_with_message(message: &str, data: Value) -> Response {
    (
        StatusCode::OK,
        Json(json!({"success": true, "message": message, "data": data})),
    )
        .into_response()
}

pub fn created(message: &str, data: Value) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({"success": true, "message": message, "data": data})),
    )
        .into_response()
}

pub fn fail(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"success": false, "message": message})),
    )
        .into_response()
}

/// Maps the error taxonomy onto the wire: validation 400, missing record
/// 404, store trouble 503, everything else a generic 500 with the detail
/// kept server-side.
pub fn from_error(err: ApiaryError) -> Response {
    match err {
        ApiaryError::Validation(msg) => fail(StatusCode::BAD_REQUEST, &msg),
        ApiaryError::NotFound(msg) => fail(StatusCode::NOT_FOUND, &msg),
        ApiaryError::StoreUnavailable => {
            fail(StatusCode::SERVICE_UNAVAILABLE, "service temporarily unavailable")
        }
        ApiaryError::Store(msg) => {
            error!(error = %msg, "attack store failure");
            fail(StatusCode::SERVICE_UNAVAILABLE, "service temporarily unavailable")
        }
        other => {
            error!(error = %other, "request failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let resp = from_error(ApiaryError::Validation("missing field".to_string()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let resp = from_error(ApiaryError::NotFound("wallet not found".to_string()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_trouble_maps_to_503() {
        let resp = from_error(ApiaryError::StoreUnavailable);
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let resp = from_error(ApiaryError::Store("disk full".to_string()));
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn unexpected_errors_map_to_generic_500() {
        let resp = from_error(ApiaryError::Geo("resolver exploded".to_string()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
