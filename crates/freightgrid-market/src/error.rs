//! Market context errors.

use thiserror::Error;

pub type MarketResult<T> = Result<T, MarketError>;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("signal feed unavailable: {0}")]
    Feed(String),

    #[error("invalid signal `{field}`: {value}")]
    InvalidSignal { field: &'static str, value: f64 },
}
