use chrono::{DateTime, Utc};

/// Currency symbol prices are shown with.
const CURRENCY_SYMBOL: &str = "₹";

/// Parse a decimal price string as the backend sends it (`"249.50"`).
pub fn parse_price(price: &str) -> Option<f64> {
    price.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Format a price for display, falling back to the raw string
pub fn format_price(price: &str) -> String {
    match parse_price(price) {
        Some(value) => format!("{}{:.2}", CURRENCY_SYMBOL, value),
        None => price.to_string(),
    }
}

/// Format a phone number for display
/// Normalizes 10-digit and +91-prefixed numbers to `+91 XXXXX XXXXX`
pub fn format_phone(phone: &str) -> String {
    // Extract just the digits
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => format!("+91 {} {}", &digits[0..5], &digits[5..10]),
        12 if digits.starts_with("91") => format!("+91 {} {}", &digits[2..7], &digits[7..12]),
        _ => phone.to_string(), // Return original if can't format
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp as a short date
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Human description of how long until `end`, e.g. "ends in 3d".
pub fn format_time_left(end: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (*end - now).num_minutes();
    if minutes <= 0 {
        "ended".to_string()
    } else if minutes < 60 {
        format!("ends in {}m", minutes)
    } else if minutes < 1440 {
        format!("ends in {}h", minutes / 60)
    } else {
        format!("ends in {}d", minutes / 1440)
    }
}
