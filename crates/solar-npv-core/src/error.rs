use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolarNpvError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid region: {0} (expected an identifier from 0 to 12)")]
    InvalidRegion(i64),

    #[error("Tariff lookup failed in {schedule} schedule: {reason}")]
    TariffLookup { schedule: String, reason: String },

    #[error("Output overflow: {field} = {value} does not fit the 5-digit output format")]
    OutputOverflow { field: String, value: Decimal },

    #[error("Malformed tariff table: {0}")]
    TableFormat(String),

    #[error("Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: String },

    #[error("Date error: {0}")]
    DateError(String),
}

impl From<csv::Error> for SolarNpvError {
    fn from(e: csv::Error) -> Self {
        SolarNpvError::TableFormat(e.to_string())
    }
}
