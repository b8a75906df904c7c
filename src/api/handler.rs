use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use super::models::*;
use crate::cases::models::{CaseId, CaseKind, CaseRef, CustomerId};
use crate::error::{AppError, AppResult};
use crate::settlement::{SettlementOutcome, SettlementService};

#[derive(Clone)]
pub struct AppState {
    pub settlement: Arc<SettlementService>,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

/// Outstanding balance for a case, with the customer's wallet balance
/// GET /cases/:kind/:case_id/outstanding
pub async fn get_outstanding(
    State(state): State<AppState>,
    Path((kind, case_id)): Path<(CaseKind, CaseId)>,
) -> AppResult<Json<OutstandingResponse>> {
    let quote = state.settlement.quote(CaseRef { kind, id: case_id }).await?;
    Ok(Json(OutstandingResponse::from(quote)))
}

/// GET /customers/:customer_id/wallet
pub async fn get_wallet_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
) -> AppResult<Json<WalletBalanceResponse>> {
    let balance = state.settlement.wallet_balance(customer_id).await?;
    Ok(Json(WalletBalanceResponse {
        customer_id,
        balance: balance.to_string(),
    }))
}

/// Apply a payment to a case
/// POST /cases/:kind/:case_id/settlements
///
/// Responds as soon as the payment is committed. Notifications go out in the
/// background and never change this response.
pub async fn settle_case(
    State(state): State<AppState>,
    Path((kind, case_id)): Path<(CaseKind, CaseId)>,
    Json(body): Json<SettleCaseRequest>,
) -> AppResult<(StatusCode, Json<SettlementResponse>)> {
    body.validate()
        .map_err(|e| AppError::InvalidInput(format!("Validation failed: {}", e)))?;

    let case_ref = CaseRef { kind, id: case_id };
    info!(
        case = %case_ref,
        amount = %body.amount,
        funding = ?body.funding_source,
        "Settlement requested"
    );

    let request = body.into_request(case_ref);

    match state.settlement.settle(request).await? {
        SettlementOutcome::Committed { record, .. } => Ok((
            StatusCode::CREATED,
            Json(SettlementResponse::Committed {
                payment: record.into(),
            }),
        )),
        SettlementOutcome::PendingReconciliation(notice) => {
            warn!(case = %notice.case, "Responding with reconciliation notice");
            Ok((
                StatusCode::ACCEPTED,
                Json(SettlementResponse::PendingReconciliation {
                    message: "Wallet was debited but the case payment could not be recorded. \
                              Flagged for manual reconciliation."
                        .to_string(),
                    notice: notice.into(),
                }),
            ))
        }
    }
}
