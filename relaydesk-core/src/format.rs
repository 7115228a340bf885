//! Display formatting helpers for dashboard values

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

/// Default pattern for [`format_date`]
pub const DEFAULT_DATE_PATTERN: &str = "YYYY-MM-DD HH:mm:ss";

const BYTE_UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// "5m ago" style age relative to `now`. Missing or future timestamps read as "Never".
pub fn format_relative_time(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(date) = date else {
        return "Never".to_string();
    };

    let diff_ms = (now - date).num_milliseconds();
    if diff_ms < 0 {
        return "Never".to_string();
    }

    let secs = diff_ms / 1000;
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d ago", days)
    } else if hours > 0 {
        format!("{}h ago", hours)
    } else if mins > 0 {
        format!("{}m ago", mins)
    } else {
        "Just now".to_string()
    }
}

/// Compact count: `1.2K`, `3.50M`, `1.00B`
pub fn format_number(num: Option<f64>) -> String {
    let Some(num) = num else {
        return "0".to_string();
    };

    let abs = num.abs();
    if abs >= 1e9 {
        format!("{:.2}B", num / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", num / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", num / 1e3)
    } else {
        group_thousands(num)
    }
}

/// Dollar amount; sub-cent positive values keep six decimals
pub fn format_currency(amount: Option<f64>) -> String {
    match amount {
        None => "$0.00".to_string(),
        Some(amount) if amount > 0.0 && amount < 0.01 => format!("${:.6}", amount),
        Some(amount) => format!("${:.2}", amount),
    }
}

/// Human byte size with 1024-based units, trailing zeros trimmed
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut scaled = bytes as f64;
    let mut exponent = 0;
    while scaled >= 1024.0 && exponent < BYTE_UNITS.len() - 1 {
        scaled /= 1024.0;
        exponent += 1;
    }

    format!(
        "{} {}",
        trim_fraction(&format!("{:.*}", decimals, scaled)),
        BYTE_UNITS[exponent]
    )
}

/// Render a timestamp with `YYYY MM DD HH mm ss` tokens
///
/// Each token is replaced once, left to right. A missing date renders as an empty string.
pub fn format_date<Tz: TimeZone>(date: Option<&DateTime<Tz>>, pattern: &str) -> String {
    let Some(date) = date else {
        return String::new();
    };

    pattern
        .replacen("YYYY", &date.year().to_string(), 1)
        .replacen("MM", &format!("{:02}", date.month()), 1)
        .replacen("DD", &format!("{:02}", date.day()), 1)
        .replacen("HH", &format!("{:02}", date.hour()), 1)
        .replacen("mm", &format!("{:02}", date.minute()), 1)
        .replacen("ss", &format!("{:02}", date.second()), 1)
}

fn trim_fraction(rendered: &str) -> String {
    if rendered.contains('.') {
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        rendered.to_string()
    }
}

fn group_thousands(num: f64) -> String {
    let rendered = trim_fraction(&format!("{:.3}", num));
    let (sign, unsigned) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None if sign.is_empty() || grouped != "0" => format!("{}{}", sign, grouped),
        None => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        assert_eq!(format_relative_time(None, now), "Never");
        assert_eq!(
            format_relative_time(Some(now + Duration::seconds(5)), now),
            "Never"
        );
        assert_eq!(
            format_relative_time(Some(now - Duration::seconds(30)), now),
            "Just now"
        );
        assert_eq!(
            format_relative_time(Some(now - Duration::minutes(5)), now),
            "5m ago"
        );
        assert_eq!(
            format_relative_time(Some(now - Duration::hours(2)), now),
            "2h ago"
        );
        assert_eq!(
            format_relative_time(Some(now - Duration::days(3)), now),
            "3d ago"
        );
    }

    #[test]
    fn test_number_units() {
        assert_eq!(format_number(None), "0");
        assert_eq!(format_number(Some(999.0)), "999");
        assert_eq!(format_number(Some(1234.0)), "1.2K");
        assert_eq!(format_number(Some(3_500_000.0)), "3.50M");
        assert_eq!(format_number(Some(-2_000_000_000.0)), "-2.00B");
        assert_eq!(format_number(Some(12.5)), "12.5");
        assert_eq!(format_number(Some(-0.25)), "-0.25");
    }

    #[test]
    fn test_currency() {
        assert_eq!(format_currency(None), "$0.00");
        assert_eq!(format_currency(Some(0.0)), "$0.00");
        assert_eq!(format_currency(Some(0.000123)), "$0.000123");
        assert_eq!(format_currency(Some(1.25)), "$1.25");
    }

    #[test]
    fn test_bytes() {
        assert_eq!(format_bytes(0, 2), "0 Bytes");
        assert_eq!(format_bytes(512, 2), "512 Bytes");
        assert_eq!(format_bytes(1536, 2), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024, 2), "1 MB");
        assert_eq!(format_bytes(1_288_490_189, 1), "1.2 GB");
    }

    #[test]
    fn test_date_pattern() {
        let date = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(
            format_date(Some(&date), DEFAULT_DATE_PATTERN),
            "2024-03-07 09:05:02"
        );
        assert_eq!(format_date(Some(&date), "DD/MM HH:mm"), "07/03 09:05");
        assert_eq!(format_date::<Utc>(None, DEFAULT_DATE_PATTERN), "");

        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let local = date.with_timezone(&offset);
        assert_eq!(format_date(Some(&local), "HH:mm"), "17:05");
    }
}
