//! Response helpers for admin endpoints.

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

#[derive(Serialize)]
pub struct StatusBody {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct LocationBody {
    pub location: String,
}

/// JSON array body; the total (ignoring paging) travels in `X-Total-Count`.
pub fn success_many<T: Serialize>(data: Vec<T>, total: u64) -> Response {
    let mut res = (StatusCode::OK, Json(data)).into_response();
    let headers = res.headers_mut();
    headers.insert(TOTAL_COUNT, HeaderValue::from(total));
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("X-Total-Count"),
    );
    res
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn deleted() -> (StatusCode, Json<StatusBody>) {
    (StatusCode::OK, Json(StatusBody { status: "deleted" }))
}

pub fn location(to: &str) -> LocationBody {
    LocationBody {
        location: to.to_string(),
    }
}
