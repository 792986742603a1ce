use crate::application::loan::{ErrorKind, LendingError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(LendingError);

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        ApiError(err)
    }
}

fn error_code(err: &LendingError) -> &'static str {
    match err {
        LendingError::PatronNotFound(_) => "PATRON_NOT_FOUND",
        LendingError::ItemNotFound(_) => "ITEM_NOT_FOUND",
        LendingError::LoanNotFound(_) => "LOAN_NOT_FOUND",
        LendingError::PatronNotActive { .. } => "PATRON_NOT_ACTIVE",
        LendingError::NoCopiesAvailable(_) => "NO_COPIES_AVAILABLE",
        LendingError::BorrowLimitReached { .. } => "BORROW_LIMIT_REACHED",
        LendingError::AlreadyReturned(_) => "ALREADY_RETURNED",
        LendingError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
        LendingError::InvalidLoanPeriod(_) => "INVALID_LOAN_PERIOD",
        LendingError::CopyCountConflict(_) => "COPY_COUNT_CONFLICT",
        LendingError::LoanStateConflict { .. } => "LOAN_STATE_CONFLICT",
        LendingError::Inconsistency(_) => "INCONSISTENCY",
        LendingError::LoanStoreError(_) => "LOAN_STORE_ERROR",
        LendingError::PatronDirectoryError(_) => "PATRON_DIRECTORY_ERROR",
        LendingError::CatalogError(_) => "CATALOG_ERROR",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = error_code(&self.0);

        let (status, message) = match self.0.kind() {
            // 404 Not Found - 参照先が存在しない
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),

            // 422 Unprocessable Entity - ビジネスルール違反
            ErrorKind::InvalidState => (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string()),

            // 409 Conflict - 並行更新。クライアントは再試行してよい
            ErrorKind::Conflict => (StatusCode::CONFLICT, self.0.to_string()),

            // 500 - 集約間の不整合。詳細はサービス層でログ済み
            ErrorKind::Inconsistency => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The operation was only partially applied; staff have been alerted".to_string(),
            ),

            // 500 - システム障害。詳細はログに記録し、一般的なメッセージのみ返す
            ErrorKind::Infrastructure => {
                tracing::error!(error = ?self.0, "Infrastructure error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(code, message));
        (status, body).into_response()
    }
}
