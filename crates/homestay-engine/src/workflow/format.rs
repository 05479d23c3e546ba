//! Date, money, and party-size text used in notifications and the CLI.

use chrono::{DateTime, NaiveDate};

use super::WorkflowError;

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp to Unix seconds.
pub fn parse_timestamp(text: &str) -> Result<i64, WorkflowError> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| WorkflowError::Validation(format!("invalid date: {text}")));
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp())
        .map_err(|_| WorkflowError::Validation(format!("invalid date: {text}")))
}

/// `YYYY-MM-DD HH:MM UTC`; falls back to the raw number if out of range.
pub fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
}

/// `YYYY-MM-DD` in UTC.
pub fn format_date(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}

/// Party size as shown to owners, e.g. "2 Adults 1 Kid".
pub fn party_label(adults: i64, children: i64) -> String {
    let adults_label = if adults == 1 { "Adult" } else { "Adults" };
    let mut label = format!("{adults} {adults_label}");
    if children > 0 {
        let kids = if children == 1 { "Kid" } else { "Kids" };
        label.push_str(&format!(" {children} {kids}"));
    }
    label
}

/// Minor units as a decimal amount, e.g. `12345` -> `"123.45"`.
pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Parse a non-negative decimal amount with at most two fractional digits.
pub fn parse_money(text: &str) -> Result<i64, WorkflowError> {
    let invalid = || WorkflowError::Validation(format!("invalid amount: {text}"));
    let text = text.trim();
    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() || frac.len() > 2 {
        return Err(invalid());
    }
    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let frac: i64 = if frac.is_empty() {
        0
    } else {
        let digits: i64 = frac.parse().map_err(|_| invalid())?;
        if frac.len() == 1 { digits * 10 } else { digits }
    };
    if whole < 0 || frac < 0 {
        return Err(invalid());
    }
    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac))
        .ok_or_else(invalid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dates_parse_as_utc_midnight() {
        assert_eq!(parse_timestamp("2024-03-01").unwrap(), 1_709_251_200);
        assert_eq!(parse_timestamp("2024-03-01T12:00:00+02:00").unwrap(), 1_709_287_200);
        assert!(matches!(
            parse_timestamp("March 1st"),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn timestamps_format_in_utc() {
        assert_eq!(format_timestamp(1_709_251_200), "2024-03-01 00:00 UTC");
        assert_eq!(format_date(1_709_251_200), "2024-03-01");
    }

    #[test]
    fn party_label_pluralises() {
        assert_eq!(party_label(2, 1), "2 Adults 1 Kid");
        assert_eq!(party_label(1, 0), "1 Adult");
        assert_eq!(party_label(3, 2), "3 Adults 2 Kids");
    }

    #[test]
    fn money_formats_and_parses() {
        assert_eq!(format_money(12_345), "123.45");
        assert_eq!(format_money(5), "0.05");
        assert_eq!(format_money(-150), "-1.50");
        assert_eq!(parse_money("123.45").unwrap(), 12_345);
        assert_eq!(parse_money("80").unwrap(), 8_000);
        assert_eq!(parse_money("9.5").unwrap(), 950);
        assert!(parse_money("1.234").is_err());
        assert!(parse_money("-3").is_err());
        assert!(parse_money("abc").is_err());
    }
}
