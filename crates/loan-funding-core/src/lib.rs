pub mod error;
pub mod rounding;
pub mod types;

#[cfg(feature = "funding")]
pub mod funding;

#[cfg(feature = "schedule")]
pub mod schedule;

#[cfg(feature = "escalation")]
pub mod escalation;

pub use error::FundingError;
pub use types::*;

/// Standard result type for all loan-funding operations
pub type FundingResult<T> = Result<T, FundingError>;
