use chrono::{Local, TimeZone};

/// Prices below this are shown in exponential notation.
const EXPONENTIAL_BELOW: f64 = 0.000_000_01;

pub fn format_price(price: f64) -> String {
    if !price.is_finite() || price == 0.0 {
        return "0.00000000".to_string();
    }
    if price < EXPONENTIAL_BELOW {
        return format!("{:.8e}", price);
    }
    format!("{:.8}", price)
}

pub fn format_market_cap(market_cap: f64) -> String {
    if !market_cap.is_finite() || market_cap == 0.0 {
        return "$0".to_string();
    }
    if market_cap >= 1_000_000.0 {
        return format!("${:.2}M", market_cap / 1_000_000.0);
    }
    format!("${}", format_number(market_cap))
}

/// en-US style number: comma-grouped integer part, at most three fraction
/// digits, trailing zeros dropped.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = format!("{:.3}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

/// Local wall-clock `HH:MM` for an epoch-millisecond timestamp.
pub fn format_time(epoch_ms: i64) -> String {
    Local
        .timestamp_millis_opt(epoch_ms)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Local date and time for an epoch-second timestamp.
pub fn format_datetime(epoch_secs: i64) -> String {
    Local
        .timestamp_opt(epoch_secs, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// `abcd...wxyz` form used in the holder and transfer lists.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 8 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
