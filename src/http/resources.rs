//! Read-only cluster listings for the console UI.
//!
//! `GET /api/pods`, `/api/{namespace}/pods`, `/api/services` and
//! `/api/{namespace}/services` answer with a JSON array straight from the
//! directory. A directory failure is a 500 with the error as plain text.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ResolveError;
use crate::http::server::AppState;

pub async fn all_pods(State(state): State<AppState>) -> Response {
    list_pods(&state, None).await
}

pub async fn namespaced_pods(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Response {
    list_pods(&state, Some(&namespace)).await
}

pub async fn all_services(State(state): State<AppState>) -> Response {
    list_services(&state, None).await
}

pub async fn namespaced_services(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Response {
    list_services(&state, Some(&namespace)).await
}

async fn list_pods(state: &AppState, namespace: Option<&str>) -> Response {
    match state.directory.list_pods(namespace).await {
        Ok(pods) => Json(pods).into_response(),
        Err(e) => listing_failed("pods", namespace, e),
    }
}

async fn list_services(state: &AppState, namespace: Option<&str>) -> Response {
    match state.directory.list_services(namespace).await {
        Ok(services) => Json(services).into_response(),
        Err(e) => listing_failed("services", namespace, e),
    }
}

fn listing_failed(what: &str, namespace: Option<&str>, error: ResolveError) -> Response {
    tracing::error!(
        resource = what,
        namespace = namespace.unwrap_or("*"),
        error = %error,
        "Listing failed"
    );
    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
}
