//! HTTP API.
//!
//! Paylink routes require the API token; the webhook authenticates through
//! its path secret; health and simulator routes are public.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use paygate_core::reference::has_tenant_prefix;
use paygate_core::webhook::normalize;
use paygate_core::{PaymentLink, PaymentLinkRequest, PaymentSummary, ReferenceId, RequestContext};
use paygate_engine::{Decision, IgnoreReason};

use crate::auth::{require_api_token, token_matches};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/rest/v1";
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Use the caller's request id when one is supplied.
fn request_context(headers: &HeaderMap) -> RequestContext {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(RequestContext::with_request_id)
        .unwrap_or_default()
}

/// Route-level reference id check. Nothing downstream is touched on failure.
fn checked_refid(state: &AppState, raw: &str) -> ApiResult<String> {
    let id = ReferenceId::parse(raw).map_err(|_| {
        tracing::warn!(refid = raw, "received invalid paylink id");
        ApiError::InvalidReferenceId(raw.to_string())
    })?;
    if !has_tenant_prefix(id.as_str(), &state.tenant_prefix) {
        tracing::warn!(refid = raw, "paylink id with foreign prefix");
        return Err(ApiError::InvalidReferenceId(raw.to_string()));
    }
    Ok(id.to_string())
}

/// `185.00 EUR` style rendering of cents.
fn format_amount(value: i64, currency: &str) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".into(),
    })
}

async fn handle_create_paylink(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<PaymentLinkRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let ctx = request_context(&headers);
    let Json(data) = body.map_err(|e| {
        tracing::warn!(
            request_id = %ctx.request_id,
            error = %e,
            "paylink body could not be parsed"
        );
        ApiError::ParseError(e.body_text())
    })?;

    if let Some(errs) = state.orchestrator.validate_request(&data) {
        tracing::warn!(request_id = %ctx.request_id, fields = ?errs, "paylink request invalid");
        return Err(ApiError::InvalidData(errs));
    }

    let link: PaymentLink = state
        .orchestrator
        .create_payment_link(&ctx, &data)
        .await
        .map_err(|e| ApiError::from_reconcile(&data.reference_id, e))?;

    let location = format!("{}/paylinks/{}", API_PREFIX, link.reference_id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(link)).into_response())
}

async fn handle_get_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(refid): Path<String>,
) -> ApiResult<Json<PaymentSummary>> {
    let ctx = request_context(&headers);
    let id = checked_refid(&state, &refid)?;
    let summary = state
        .orchestrator
        .get_payment(&ctx, &id)
        .await
        .map_err(|e| ApiError::from_reconcile(&id, e))?;
    Ok(Json(summary))
}

async fn handle_cancel_paylink(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(refid): Path<String>,
) -> ApiResult<StatusCode> {
    let ctx = request_context(&headers);
    let id = checked_refid(&state, &refid)?;
    state
        .orchestrator
        .cancel_payment_link(&ctx, &id)
        .await
        .map_err(|e| ApiError::from_reconcile(&id, e))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_status_check(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(refid): Path<String>,
) -> ApiResult<Json<PaymentSummary>> {
    let ctx = request_context(&headers);
    let id = checked_refid(&state, &refid)?;
    let outcome = state
        .engine
        .check_payment_status(&ctx, &id)
        .await
        .map_err(|e| ApiError::from_reconcile(&id, e))?;

    match outcome.decision {
        Decision::Unattributable => Err(ApiError::Unattributable(format!(
            "cannot determine debitor of {}",
            id
        ))),
        ref d if d.is_conflict() => Err(ApiError::Conflict {
            reference_id: id,
            message: match d {
                Decision::AlreadySettled { status } => format!("transaction already {}", status),
                _ => "amount or currency differs from gateway, kept pending".to_string(),
            },
            payment: outcome.payment.map(Box::new),
        }),
        _ => outcome
            .payment
            .map(Json)
            .ok_or(ApiError::NotFound(id)),
    }
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(secret): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let ctx = request_context(&headers);
    if !token_matches(&state.webhook_secret, &secret) {
        tracing::warn!(request_id = %ctx.request_id, "invalid secret for webhook");
        return Err(ApiError::unauthorized("invalid secret supplied"));
    }

    if state.full_requests {
        let raw = String::from_utf8_lossy(&body).replace('\r', "").replace('\n', "\\n");
        state.engine.log_raw_webhook(&ctx, &raw).await;
    }

    let webhook = normalize(&body).map_err(|e| {
        tracing::warn!(
            request_id = %ctx.request_id,
            error = %e,
            "webhook body could not be parsed"
        );
        ApiError::from(e)
    })?;

    let outcome = state
        .engine
        .handle_normalized(&ctx, webhook)
        .await
        .map_err(|e| ApiError::from_reconcile("", e))?;

    match &outcome.decision {
        Decision::Ignored(IgnoreReason::TenantMismatch) => {
            tracing::info!(
                request_id = %ctx.request_id,
                reference_id = %outcome.reference_id,
                "webhook for another tenant ignored"
            );
        }
        decision => {
            tracing::info!(
                request_id = %ctx.request_id,
                reference_id = %outcome.reference_id,
                ?decision,
                "webhook processed"
            );
        }
    }
    Ok(StatusCode::OK)
}

fn plain_text(status: StatusCode, message: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], message).into_response()
}

/// Simulated hosted payment page: paying is just visiting the link.
async fn handle_simulator(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(refid): Path<String>,
) -> Response {
    let ctx = request_context(&headers);
    let Some(simulator) = state.simulator.as_ref() else {
        return plain_text(StatusCode::NOT_FOUND, "not found".into());
    };

    let event = match simulator.complete(&refid) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                refid = %refid,
                error = %e,
                "simulator paylink not found (may be lost after restart)"
            );
            return plain_text(StatusCode::NOT_FOUND, "not found".into());
        }
    };

    let amount = format_amount(event.amount.value, &event.amount.currency);
    if let Err(e) = state.engine.handle_webhook(&ctx, event).await {
        tracing::warn!(refid = %refid, error = %e, "failed to report simulated payment");
        return plain_text(
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to report to local webhook - see log for details".into(),
        );
    }

    tracing::info!(refid = %refid, %amount, "simulator paid");
    plain_text(StatusCode::OK, format!("paid refId {} for {}", refid, amount))
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    let paylinks = Router::new()
        .route("/paylinks", post(handle_create_paylink))
        .route(
            "/paylinks/{refid}",
            get(handle_get_payment).delete(handle_cancel_paylink),
        )
        .route("/paylinks/{refid}/status-check", post(handle_status_check))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_token));

    let api = Router::new()
        .merge(paylinks)
        .route("/webhook/{secret}", post(handle_webhook));

    Router::new()
        .route("/", get(handle_health))
        .route("/info/health", get(handle_health))
        .route("/simulator/{refid}", get(handle_simulator))
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_api_server(listen_addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
