//! Formatting and view models for the dashboard surfaces.

pub mod fallback;
pub mod format;
pub mod views;

pub use format::{DateFormat, Trend};
pub use views::{LiveStatus, PredictionView, StockRow};
