pub mod calendar;
pub mod metrics;
pub mod sample;
pub mod stats;
pub mod types;
pub mod views;

pub use types::{MarkupEntry, NewMarkup, Timeframe};
