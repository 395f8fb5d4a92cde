//! HTTP response metrics.

use {
    axum::{body::Body, http::Request, middleware::Next, response::Response},
    inlet_metrics::{counter, http as http_metrics, labels},
};

/// Count responses by status code.
///
/// Records `inlet_http_responses_total{status}`. Paths are not used as
/// labels since channel ids in the path come from untrusted callers.
pub async fn http_metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status().as_u16().to_string();
    counter!(http_metrics::RESPONSES_TOTAL, labels::STATUS => status).increment(1);
    response
}
