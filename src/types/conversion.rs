use crate::types::errors::ConversionError;
use rust_decimal::Decimal;

/// Derives the USD equivalent of a local-currency amount.
///
/// The rate is expressed in local-currency units per USD. A missing, zero or negative rate
/// is treated as "no conversion available" and yields zero rather than an error.
///
/// The quotient keeps the full precision `Decimal` offers (28 significant digits); no
/// rounding is applied on top of that.
///
/// # Errors
/// Returns `ConversionError::Overflow` if the quotient does not fit in a `Decimal`.
pub fn to_usd(amount_ars: Decimal, exchange_rate: Option<Decimal>) -> Result<Decimal, ConversionError> {
    match exchange_rate {
        Some(rate) if rate > Decimal::ZERO => amount_ars
            .checked_div(rate)
            .ok_or(ConversionError::Overflow { amount_ars, exchange_rate: rate }),
        _ => Ok(Decimal::ZERO)
    }
}
