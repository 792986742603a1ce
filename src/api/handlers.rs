use crate::application::loan::{self, ServiceDependencies};
use crate::domain::commands::{BorrowItem, DeclareLost, ReturnLoan};
use crate::domain::{ItemId, LoanId, PatronId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BorrowRequest, EligibilityQuery, EligibilityResponse, FineResponse, LoanResponse,
        PatronLoansQuery, ReconciliationResponse, ReturnResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Command handlers (POST)
// ============================================================================

/// POST /loans - 資料を貸し出す
///
/// loan_period_days を省略した場合はポリシーの既定値を使う。
pub async fn borrow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let cmd = BorrowItem {
        patron_id: PatronId::from_uuid(req.patron_id),
        item_id: ItemId::from_uuid(req.item_id),
        loan_period_days: req
            .loan_period_days
            .unwrap_or(state.service_deps.policy.default_loan_period_days),
    };

    let loan = loan::borrow(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(LoanResponse::from(loan))))
}

/// POST /loans/:id/return - 資料を返却する
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let cmd = ReturnLoan {
        loan_id: LoanId::from_uuid(loan_id),
    };

    let receipt = loan::return_loan(&state.service_deps, cmd).await?;

    Ok(Json(ReturnResponse::from(receipt)))
}

/// POST /loans/:id/lost - 貸出を紛失扱いにする
pub async fn declare_lost(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan_id = LoanId::from_uuid(loan_id);

    loan::declare_lost(&state.service_deps, DeclareLost { loan_id }).await?;
    let updated = loan::get_loan(&state.service_deps, loan_id).await?;

    Ok(Json(LoanResponse::from(updated)))
}

/// POST /reconciliations - 延滞照合を現在時刻で実行する
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let now = state.service_deps.clock.now();
    let report = loan::reconcile_overdue(&state.service_deps, now).await?;

    Ok(Json(ReconciliationResponse::from(report)))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /loans/:id - 貸出をIDで取得
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = loan::get_loan(&state.service_deps, LoanId::from_uuid(loan_id)).await?;
    Ok(Json(LoanResponse::from(loan)))
}

/// GET /loans/:id/fine - 現在時刻での延滞料金
pub async fn get_fine(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<FineResponse>, ApiError> {
    let fine = loan::calculate_fine(&state.service_deps, LoanId::from_uuid(loan_id)).await?;

    Ok(Json(FineResponse {
        loan_id,
        fine_amount: fine.minor_units(),
    }))
}

/// GET /patrons/:id/loans - 利用者の貸出（新しい順）
///
/// open_only=true の場合は未返却のみ。
pub async fn list_patron_loans(
    State(state): State<Arc<AppState>>,
    Path(patron_id): Path<Uuid>,
    Query(query): Query<PatronLoansQuery>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let patron_id = PatronId::from_uuid(patron_id);

    let loans = if query.open_only {
        loan::patron_open_loans(&state.service_deps, patron_id).await?
    } else {
        loan::patron_loans(&state.service_deps, patron_id).await?
    };

    Ok(Json(loans.into_iter().map(LoanResponse::from).collect()))
}

/// GET /eligibility - 貸出可否の事前確認（在庫は予約しない）
pub async fn check_eligibility(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EligibilityQuery>,
) -> Result<Json<EligibilityResponse>, ApiError> {
    let eligible = loan::eligibility(
        &state.service_deps,
        PatronId::from_uuid(query.patron_id),
        ItemId::from_uuid(query.item_id),
    )
    .await?;

    Ok(Json(EligibilityResponse { eligible }))
}
