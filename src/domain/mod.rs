pub mod commands;
pub mod errors;
pub mod fine;
pub mod item;
pub mod loan;
pub mod patron;
pub mod policy;
pub mod value_objects;

pub use errors::*;
pub use item::Item;
pub use loan::{Loan, LoanStatus, NewLoan};
pub use patron::{Patron, PatronStatus};
pub use policy::LendingPolicy;
pub use value_objects::*;
