mod conversion;
mod errors;

pub use conversion::to_usd;
pub use errors::ConversionError;

pub type TransactionId = i64;
pub type Year = i32;
