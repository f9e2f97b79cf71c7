pub mod error;
pub mod profile;
pub mod projection;
pub mod tariff;
pub mod time_value;
pub mod types;
pub mod valuation;

pub use error::SolarNpvError;

pub type SolarNpvResult<T> = Result<T, SolarNpvError>;
