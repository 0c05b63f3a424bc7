//! Synthesized responses.
//!
//! # Responsibilities
//! - Turn transport failures into a readable 503 instead of an error
//! - Render error source chains for diagnostics

use std::error::Error;

use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};

/// `503 Service Unavailable` describing why `target` could not be reached.
pub fn service_unavailable(target: &str, error: &str) -> Response<Body> {
    let message = format!("Error: '{}'\nTrying to reach: '{}'", error, target);
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// `error` followed by each of its sources, separated by `: `.
pub fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
