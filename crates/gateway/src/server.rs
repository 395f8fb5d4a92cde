use std::{any::Any, net::SocketAddr, sync::Arc};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::{DefaultBodyLimit, Path, State, rejection::BytesRejection},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    inlet_channels::{ValidationCode, ValidationError, WebAdapter, WebInbound},
    inlet_config::{InletConfig, Severity, check_config},
    inlet_protocol::{ResponseEnvelope, WEB_CHANNEL, error_codes},
    tower_http::{
        catch_panic::CatchPanicLayer,
        cors::{Any as AnyOrigin, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{error, info, warn},
};

#[cfg(feature = "metrics")]
use inlet_metrics::{MetricsRecorderConfig, counter, http as http_metrics, init_metrics, labels};

use crate::{
    dispatcher::DispatchReport,
    outcome::{Failure, HANDLER_FAILURE_MESSAGE},
    pipeline::Pipeline,
    report::WebReport,
    state::GatewayState,
};

const UNREADABLE_BODY_MESSAGE: &str = "could not read request body";

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);
    let body_limit = state.pipeline.validator().rules().max_payload_bytes;

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/webhook", post(webhook_handler))
        .route("/api/channels/{channel_id}/events", post(channel_event_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route(
        "/metrics",
        get(crate::metrics_routes::prometheus_metrics_handler),
    );

    #[cfg(feature = "metrics")]
    let router = router.layer(axum::middleware::from_fn(
        crate::metrics_middleware::http_metrics_middleware,
    ));

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(AppState { gateway: state })
}

/// Build the shared state for `config`.
///
/// The metrics recorder is installed first so the gauges set while channels
/// are registered reach the exporter.
pub fn build_gateway_state(config: &InletConfig) -> anyhow::Result<Arc<GatewayState>> {
    #[cfg(feature = "metrics")]
    {
        let metrics_handle = if config.metrics.enabled {
            Some(init_metrics(MetricsRecorderConfig {
                enabled: true,
                global_labels: config
                    .metrics
                    .labels
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            })?)
        } else {
            None
        };
        let pipeline = Pipeline::from_config(config)?;
        Ok(GatewayState::with_metrics(pipeline, metrics_handle))
    }
    #[cfg(not(feature = "metrics"))]
    {
        Ok(GatewayState::new(Pipeline::from_config(config)?))
    }
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start_gateway(config: InletConfig) -> anyhow::Result<()> {
    let diagnostics = check_config(&config);
    for d in &diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s); run `inlet config check` for details");
    }

    let state = build_gateway_state(&config)?;

    let listener =
        tokio::net::TcpListener::bind((config.server.bind.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;

    // Startup banner.
    let dispatch = state.pipeline.dispatcher().options();
    let channels = state.pipeline.dispatcher().registry().list().join(", ");
    let lines = [
        format!("inlet gateway v{}", state.version),
        format!("listening on http://{addr}"),
        format!("channels: {channels}"),
        format!(
            "handler timeout: {}ms, idempotency window: {}s ({} max)",
            dispatch.handler_timeout.as_millis(),
            dispatch.idempotency_ttl.as_secs(),
            dispatch.idempotency_max_entries,
        ),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    let app = build_gateway_app(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, draining connections");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let dispatcher = state.gateway.pipeline.dispatcher();
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
        "uptimeSecs": state.gateway.started_at.elapsed().as_secs(),
        "channels": dispatcher.registry().list(),
        "activeConversations": dispatcher.active_conversations(),
        "idempotencyRecords": dispatcher.idempotency_records(),
    }))
}

/// `POST /api/webhook`: the web channel.
async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> WebReport {
    receive(&state, WEB_CHANNEL.to_owned(), headers, body).await
}

/// `POST /api/channels/{channel_id}/events`: any registered channel.
async fn channel_event_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> WebReport {
    receive(&state, channel_id, headers, body).await
}

async fn receive(
    state: &AppState,
    channel_id: String,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> WebReport {
    let pipeline = &state.gateway.pipeline;

    #[cfg(feature = "metrics")]
    {
        let channel = if pipeline.dispatcher().registry().contains(&channel_id) {
            channel_id.clone()
        } else {
            "unregistered".to_string()
        };
        counter!(http_metrics::EVENTS_RECEIVED_TOTAL, labels::CHANNEL => channel).increment(1);
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            return WebReport(DispatchReport::fresh(body_failure(rejection.status(), &rejection.body_text()).into()));
        },
    };
    let inbound = WebInbound {
        channel_id,
        headers,
        body,
    };
    WebReport(pipeline.submit(&WebAdapter, inbound).await)
}

fn body_failure(status: StatusCode, detail: &str) -> Failure {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        Failure::validation(&ValidationError {
            code: ValidationCode::PayloadTooLarge,
            reason: "payload exceeds the configured limit".into(),
        })
    } else {
        warn!(%status, detail, "could not read request body");
        Failure::malformed(UNREADABLE_BODY_MESSAGE)
    }
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ResponseEnvelope::err(
            error_codes::HANDLER_FAILURE,
            HANDLER_FAILURE_MESSAGE,
        )),
    )
        .into_response()
}
