use std::convert::Infallible;
use tracing::{debug, error};
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use super::state::AppState;
use super::types::ErrorResponse;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub async fn health(state: AppState) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.health.get_status().await))
}

pub async fn stats(state: AppState) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.connections.get_stats().await))
}

pub async fn steering(state: AppState) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&state.hub.snapshot().await))
}

pub async fn metrics(state: AppState) -> Result<impl Reply, Infallible> {
    state
        .metrics
        .record_connections(&state.connections.get_stats().await);

    let (body, status) = match state.metrics.render() {
        Ok(text) => (text, StatusCode::OK),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (String::new(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    Ok(warp::reply::with_header(
        warp::reply::with_status(body, status),
        "content-type",
        PROMETHEUS_CONTENT_TYPE,
    ))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        debug!("Request rejected: {:?}", err);
        (StatusCode::BAD_REQUEST, "Bad request")
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse::new(message, None)),
        status,
    ))
}
