mod errors;
mod loan_service;
mod reconciliation;

pub use errors::{ErrorKind, Inconsistency, LendingError, Result};
pub use loan_service::{
    ReturnReceipt, ServiceDependencies, borrow, calculate_fine, declare_lost, eligibility,
    get_loan, patron_loans, patron_open_loans, return_loan,
};
pub use reconciliation::{
    ReconciliationFailure, ReconciliationReport, reconcile_overdue, spawn_reconciliation_loop,
};
