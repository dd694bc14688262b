use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Conversion error: {amount_ars} / {exchange_rate} overflows")]
    Overflow {
        amount_ars: Decimal,
        exchange_rate: Decimal
    }
}
