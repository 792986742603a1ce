pub mod catalog;
pub mod clock;
pub mod loan_store;
pub mod patron_directory;

pub use catalog::Catalog;
pub use clock::FixedClock;
pub use loan_store::LoanStore;
pub use patron_directory::PatronDirectory;
