//! Inbound report webhooks.
//!
//! Each handler decodes its body, hands the report to the coordinator and
//! acknowledges as soon as the merge is done. A delivery started by the
//! report keeps running after the response is sent.

use crate::WebResult;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use order_confirmation_core::order::Dimension;
use order_confirmation_core::report::Report;

/// Acknowledgement body for every accepted report.
pub const ACCEPTED: &str = "success";

async fn accept(
    state: &AppState,
    dimension: Dimension,
    body: &[u8],
    status: StatusCode,
) -> WebResult<(StatusCode, Json<&'static str>)> {
    let report = Report::decode(dimension, body)?;
    let submission = state.coordinator.submit(report).await;

    tracing::info!(
        order_id = %submission.receipt.order_id,
        dimension = %dimension,
        outcome = submission.receipt.outcome.as_str(),
        completed = submission.receipt.completed.map(|status| status.as_str()),
        "Report accepted"
    );

    // Dropping the handle detaches the delivery task
    drop(submission.delivery);
    Ok((status, Json(ACCEPTED)))
}

/// Payment confirmation webhook.
///
/// ```text
/// POST /order_status/webhook/payment_confirmation
/// ```
///
/// # Errors
///
/// Returns 400 if the body is not a valid payment report.
pub async fn payment_confirmation(
    State(state): State<AppState>,
    body: Bytes,
) -> WebResult<(StatusCode, Json<&'static str>)> {
    accept(&state, Dimension::Payment, &body, StatusCode::OK).await
}

/// Fraud check webhook.
///
/// ```text
/// POST /order_status/webhook/fraud_check
/// ```
///
/// # Errors
///
/// Returns 400 if the body is not a valid fraud report.
pub async fn fraud_check(
    State(state): State<AppState>,
    body: Bytes,
) -> WebResult<(StatusCode, Json<&'static str>)> {
    accept(&state, Dimension::Fraud, &body, StatusCode::OK).await
}

/// Vendor confirmation webhook.
///
/// ```text
/// POST /order_status/webhook/vendor_confirmation
/// ```
///
/// # Errors
///
/// Returns 400 if the body is not a valid vendor report.
pub async fn vendor_confirmation(
    State(state): State<AppState>,
    body: Bytes,
) -> WebResult<(StatusCode, Json<&'static str>)> {
    accept(&state, Dimension::Vendor, &body, StatusCode::CREATED).await
}
