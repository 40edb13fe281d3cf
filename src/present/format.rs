//! Number and date formatting shared by every view.

use chrono::{DateTime, Datelike, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Colour class of a signed figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Positive,
    Negative,
    Neutral,
}

impl Trend {
    pub fn of(value: Decimal) -> Self {
        if value.is_sign_positive() && !value.is_zero() {
            Trend::Positive
        } else if value.is_sign_negative() && !value.is_zero() {
            Trend::Negative
        } else {
            Trend::Neutral
        }
    }

    /// Gains and flat figures share the positive colour on cards.
    pub fn of_change(value: Decimal) -> Self {
        if value.is_sign_negative() && !value.is_zero() {
            Trend::Negative
        } else {
            Trend::Positive
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Trend::Positive => "text-success",
            Trend::Negative => "text-destructive",
            Trend::Neutral => "text-muted-foreground",
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `1234.5` -> `1,234.50`, no sign.
fn grouped_abs(value: Decimal) -> String {
    let fixed = format!("{:.2}", value.abs().round_dp(2));
    match fixed.split_once('.') {
        Some((int, frac)) => format!("{}.{}", group_thousands(int), frac),
        None => group_thousands(&fixed),
    }
}

/// `$1,234.56`; negatives as `-$1,234.56`.
pub fn currency(value: Decimal) -> String {
    if value.is_sign_negative() && !value.round_dp(2).is_zero() {
        format!("-${}", grouped_abs(value))
    } else {
        format!("${}", grouped_abs(value))
    }
}

/// `+$2,431.50` / `-$28.45`.
pub fn signed_currency(value: Decimal) -> String {
    if value.is_sign_negative() && !value.round_dp(2).is_zero() {
        format!("-${}", grouped_abs(value))
    } else {
        format!("+${}", grouped_abs(value))
    }
}

/// `+1.97%` / `-5.26%`.
pub fn signed_percent(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("{:.2}%", rounded)
    } else {
        format!("+{:.2}%", rounded.abs())
    }
}

/// Plain price with two decimals and no grouping, as on cards.
pub fn price(value: Decimal) -> String {
    format!("${:.2}", value.round_dp(2))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
}

impl DateFormat {
    pub fn format<Tz: TimeZone>(&self, date: &DateTime<Tz>) -> String {
        let (day, month, year) = (date.day(), date.month(), date.year());
        match self {
            DateFormat::MonthDayYear => format!("{month:02}/{day:02}/{year}"),
            DateFormat::DayMonthYear => format!("{day:02}/{month:02}/{year}"),
            DateFormat::Iso => format!("{year}-{month:02}-{day:02}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_currency_groups_thousands() {
        assert_eq!(currency(d("125432.18")), "$125,432.18");
        assert_eq!(currency(d("1234.5")), "$1,234.50");
        assert_eq!(currency(d("999")), "$999.00");
        assert_eq!(currency(d("0")), "$0.00");
        assert_eq!(currency(d("-1234567.891")), "-$1,234,567.89");
    }

    #[test]
    fn test_signed_figures() {
        assert_eq!(signed_currency(d("2431.5")), "+$2,431.50");
        assert_eq!(signed_currency(d("-28.45")), "-$28.45");
        assert_eq!(signed_percent(d("1.97")), "+1.97%");
        assert_eq!(signed_percent(d("-5.2561")), "-5.26%");
        assert_eq!(signed_percent(d("-0.001")), "+0.00%");
    }

    #[test]
    fn test_trend_classes() {
        assert_eq!(Trend::of(d("0.5")), Trend::Positive);
        assert_eq!(Trend::of(d("-0.5")), Trend::Negative);
        assert_eq!(Trend::of(Decimal::ZERO), Trend::Neutral);
        assert_eq!(Trend::of_change(Decimal::ZERO), Trend::Positive);
        assert_eq!(Trend::Negative.css_class(), "text-destructive");
    }

    #[test]
    fn test_date_formats() {
        let date = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(DateFormat::MonthDayYear.format(&date), "03/07/2026");
        assert_eq!(DateFormat::DayMonthYear.format(&date), "07/03/2026");
        assert_eq!(DateFormat::Iso.format(&date), "2026-03-07");
    }

    #[test]
    fn test_date_format_serde_names() {
        let f: DateFormat = serde_json::from_str("\"YYYY-MM-DD\"").unwrap();
        assert_eq!(f, DateFormat::Iso);
        assert_eq!(serde_json::to_string(&DateFormat::default()).unwrap(), "\"MM/DD/YYYY\"");
    }
}
