pub mod catalog;
pub mod loan_store;
pub mod patron_directory;

// パブリックに型を再エクスポート
pub use catalog::Catalog as PostgresCatalog;
pub use loan_store::LoanStore as PostgresLoanStore;
pub use patron_directory::PatronDirectory as PostgresPatronDirectory;
