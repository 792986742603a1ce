use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, borrow, check_eligibility, declare_lost, get_fine, get_loan, list_patron_loans,
    reconcile, return_loan,
};

/// Creates the API router with all lending endpoints
///
/// Command endpoints:
/// - POST /loans - Borrow an item
/// - POST /loans/:id/return - Return a loan
/// - POST /loans/:id/lost - Declare a loan lost
/// - POST /reconciliations - Run the overdue sweep now
///
/// Query endpoints:
/// - GET /loans/:id
/// - GET /loans/:id/fine
/// - GET /patrons/:id/loans?open_only=
/// - GET /eligibility?patron_id=&item_id=
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/loans", post(borrow))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/return", post(return_loan))
        .route("/loans/:id/lost", post(declare_lost))
        .route("/loans/:id/fine", get(get_fine))
        .route("/patrons/:id/loans", get(list_patron_loans))
        .route("/eligibility", get(check_eligibility))
        .route("/reconciliations", post(reconcile))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
