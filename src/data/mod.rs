//! Core data models for the MGNREGA comparison service
//!
//! Raw records come from the upstream API as untyped JSON objects. This module
//! holds the record accessors shared by the aggregator and the presentation
//! helpers, plus the derived per-district summary type.

pub mod aggregate;
pub mod source;

pub use aggregate::{aggregate, Aggregation, ParseFailures};
pub use source::{DataGovClient, RecordSource, SourceError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single upstream record, kept as the untyped object the API returned
pub type RawRecord = Map<String, Value>;

/// Upstream field holding the district name
pub const DISTRICT_NAME: &str = "district_name";
/// Upstream field holding the financial year (e.g. "2024-2025")
pub const FIN_YEAR: &str = "fin_year";
/// Upstream field holding the abbreviated month name
pub const MONTH: &str = "month";
/// Average wage rate per person per day
pub const AVG_WAGE: &str = "Average_Wage_rate_per_day_per_person";
/// Average days of employment provided per household
pub const EMP_DAYS: &str = "Average_days_of_employment_provided_per_Household";
/// Total expenditure
pub const TOTAL_EXP: &str = "Total_Exp";
/// Women persondays
pub const WOMEN_PERSONDAYS: &str = "Women_Persondays";
/// Number of completed works
pub const COMPLETED_WORKS: &str = "Number_of_Completed_Works";
/// Number of ongoing works
pub const ONGOING_WORKS: &str = "Number_of_Ongoing_Works";

/// Outcome of reading a numeric field from a raw record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Field absent, null, or an empty string
    Missing,
    /// Field parsed to a finite number
    Number(f64),
    /// Field present but not a finite number
    Invalid,
}

impl FieldValue {
    /// Best-effort numeric value: anything that is not a number counts as zero
    pub fn or_zero(self) -> f64 {
        match self {
            FieldValue::Number(value) => value,
            FieldValue::Missing | FieldValue::Invalid => 0.0,
        }
    }

    pub fn is_invalid(self) -> bool {
        matches!(self, FieldValue::Invalid)
    }
}

/// Reads a numeric field that may be a JSON number or a numeric string
///
/// A string must be a number in full once trimmed.
pub fn numeric_field(record: &RawRecord, key: &str) -> FieldValue {
    read_number(record, key, |s| s.parse::<f64>().ok())
}

/// Reads a numeric field, taking the longest leading number of a string
///
/// `"250abc"` reads as 250; a string with no leading number is invalid.
pub fn leading_numeric_field(record: &RawRecord, key: &str) -> FieldValue {
    read_number(record, key, leading_number)
}

fn read_number(record: &RawRecord, key: &str, parse: fn(&str) -> Option<f64>) -> FieldValue {
    let parsed = match record.get(key) {
        None | Some(Value::Null) => return FieldValue::Missing,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return FieldValue::Missing;
            }
            parse(trimmed)
        }
        Some(_) => None,
    };

    match parsed {
        Some(value) if value.is_finite() => FieldValue::Number(value),
        _ => FieldValue::Invalid,
    }
}

/// Parses the longest prefix of the form `[+-]digits[.digits][e[+-]digits]`
fn leading_number(s: &str) -> Option<f64> {
    fn digits(bytes: &[u8]) -> usize {
        bytes.iter().take_while(|b| b.is_ascii_digit()).count()
    }

    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let int_digits = digits(&bytes[end..]);
    end += int_digits;
    if bytes.get(end) == Some(&b'.') {
        let frac_digits = digits(&bytes[end + 1..]);
        if int_digits + frac_digits == 0 {
            return None;
        }
        end += 1 + frac_digits;
    } else if int_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().ok()
}

/// Reads a string field, treating non-strings as absent
pub fn text_field<'a>(record: &'a RawRecord, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Returns the record's district name, or `None` when it is missing or empty
pub fn district_name(record: &RawRecord) -> Option<&str> {
    text_field(record, DISTRICT_NAME).filter(|name| !name.is_empty())
}

/// Extra digits printed past the rounding position when rounding
const EXACT_DIGITS: usize = 40;

/// Formats `value` with `places` decimals
///
/// Rounds the exact decimal value of the double with ties away from zero, so
/// `0.015` (stored just below 0.015) gives `"0.01"` and `0.125` gives `"0.13"`.
pub fn to_fixed(value: f64, places: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let exact = format!("{:.*}", places + EXACT_DIGITS, value.abs());
    let (kept, dropped) = exact.split_at(exact.len() - EXACT_DIGITS);
    let mut digits: Vec<char> = kept.trim_end_matches('.').chars().collect();

    if dropped.starts_with(|c: char| c >= '5') {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            match *d {
                '.' => continue,
                '9' => *d = '0',
                _ => {
                    *d = char::from(*d as u8 + 1);
                    carry = false;
                    break;
                }
            }
        }
        if carry {
            digits.insert(0, '1');
        }
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}", sign, digits.into_iter().collect::<String>())
}

/// Rounds to a fixed number of decimal places, as [`to_fixed`] does
pub fn round_to(value: f64, places: usize) -> f64 {
    to_fixed(value, places).parse().unwrap_or(value)
}

/// Per-district statistics derived from one batch of raw records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSummary {
    /// Upper-cased district name, unique within a summary set
    pub district: String,
    /// Mean of the per-record average wage, 2 decimals
    pub avg_wage: f64,
    /// Sum of per-record expenditure, 2 decimals
    pub total_exp: f64,
    /// Sum of per-record average employment days
    pub total_emp_days: f64,
    /// Sum of per-record women persondays
    pub women_persondays: f64,
    /// Women persondays as a share of employment days, 1 decimal
    pub women_percent: f64,
    /// Number of raw records behind this summary
    pub samples: u64,
}

/// Numeric summary fields that `/compare` can sort by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    AvgWage,
    TotalExp,
    TotalEmpDays,
    WomenPersondays,
    WomenPercent,
    Samples,
}

impl SummaryField {
    /// Parses a `sortby` query value; field names match the JSON keys
    pub fn from_param(s: &str) -> Option<Self> {
        match s {
            "avg_wage" => Some(SummaryField::AvgWage),
            "total_exp" => Some(SummaryField::TotalExp),
            "total_emp_days" => Some(SummaryField::TotalEmpDays),
            "women_persondays" => Some(SummaryField::WomenPersondays),
            "women_percent" => Some(SummaryField::WomenPercent),
            "samples" => Some(SummaryField::Samples),
            _ => None,
        }
    }

    /// Reads this field from a summary entry
    pub fn value(self, summary: &DistrictSummary) -> f64 {
        match self {
            SummaryField::AvgWage => summary.avg_wage,
            SummaryField::TotalExp => summary.total_exp,
            SummaryField::TotalEmpDays => summary.total_emp_days,
            SummaryField::WomenPersondays => summary.women_persondays,
            SummaryField::WomenPercent => summary.women_percent,
            SummaryField::Samples => summary.samples as f64,
        }
    }
}
