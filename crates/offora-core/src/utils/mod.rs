//! Utility functions for display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    format_date, format_phone, format_price, format_time_left, parse_price, truncate_string,
};
