mod selection;
mod transaction;

pub use selection::Selection;
pub use transaction::FinancialTransaction;
