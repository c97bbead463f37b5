//! Display formatting for amounts and dates.

use chrono::{Local, TimeZone};

/// Smallest units per whole token
pub const UNITS_PER_TOKEN: u128 = 1_000_000_000;

/// Insert `,` every three digits from the right.
pub fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Whole tokens, rounded half-up, thousands-grouped: `1479495000000000` -> `1,479,495`
pub fn format_stake(amount: u128) -> String {
    group_thousands(stake_to_tokens(amount))
}

/// Whole tokens rounded half-up
pub fn stake_to_tokens(amount: u128) -> u128 {
    amount.saturating_add(UNITS_PER_TOKEN / 2) / UNITS_PER_TOKEN
}

/// Tokens with exactly two decimals, ungrouped: `12345678900` -> `12.35`
pub fn format_reward(amount: u64) -> String {
    let hundredths = UNITS_PER_TOKEN / 100;
    let cents = (u128::from(amount) + hundredths / 2) / hundredths;
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Parse a grouped display value back into a number (`"1,479,495"` -> 1479495).
pub fn parse_grouped(value: &str) -> Option<u128> {
    value.replace(',', "").parse().ok()
}

/// Long-form local date-time, e.g. `March 5, 2025, 3:04:05 PM`.
///
/// Zero (missing) timestamps render as `Unknown`.
pub fn format_long_date(unix_secs: i64) -> String {
    if unix_secs <= 0 {
        return "Unknown".to_string();
    }
    match Local.timestamp_opt(unix_secs, 0).single() {
        Some(dt) => dt.format("%B %-d, %Y, %-I:%M:%S %p").to_string(),
        None => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_479_495), "1,479,495");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }

    #[test]
    fn test_format_stake_rounds_half_up() {
        assert_eq!(format_stake(296_099_000_000_000), "296,099");
        assert_eq!(format_stake(1_499_999_999), "1");
        assert_eq!(format_stake(1_500_000_000), "2");
        assert_eq!(format_stake(0), "0");
    }

    #[test]
    fn test_format_reward_two_decimals() {
        assert_eq!(format_reward(0), "0.00");
        assert_eq!(format_reward(12_345_678_900), "12.35");
        assert_eq!(format_reward(1_000_000_000), "1.00");
        assert_eq!(format_reward(4_999_999), "0.00");
        assert_eq!(format_reward(5_000_000), "0.01");
    }

    #[test]
    fn test_parse_grouped() {
        assert_eq!(parse_grouped("1,479,495"), Some(1_479_495));
        assert_eq!(parse_grouped("abc"), None);
    }

    #[test]
    fn test_long_date() {
        assert_eq!(format_long_date(0), "Unknown");
        let formatted = format_long_date(1_700_000_000);
        assert!(formatted.contains("2023"));
        assert!(formatted.ends_with("AM") || formatted.ends_with("PM"));
    }
}
