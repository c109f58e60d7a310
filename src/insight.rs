//! District profiles and insights for side-by-side comparison
//!
//! Turns one district's raw records into a month-ordered timeline, a compact
//! profile (averages and totals), and a one-line statement about women's
//! share of employment persondays.

use std::cmp::Ordering;

use serde::Serialize;

use crate::data::{
    leading_numeric_field, numeric_field, round_to, text_field, to_fixed, RawRecord, AVG_WAGE,
    COMPLETED_WORKS, DISTRICT_NAME, EMP_DAYS, FIN_YEAR, MONTH, ONGOING_WORKS, TOTAL_EXP,
    WOMEN_PERSONDAYS,
};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Position of a month in the calendar year, 1-12, or 0 when unrecognised
///
/// Only the dataset's own spelling ("Jan" .. "Dec") is recognised.
pub fn month_index(month: &str) -> u8 {
    MONTHS
        .iter()
        .position(|m| *m == month)
        .map_or(0, |i| i as u8 + 1)
}

/// One raw record reduced to the fields shown in a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictPoint {
    pub fin_year: String,
    pub month: String,
    pub district_name: String,
    pub avg_wage: f64,
    pub emp_days: f64,
    pub completed: f64,
    pub ongoing: f64,
    pub total_exp: f64,
    pub women_persondays: f64,
}

impl DistrictPoint {
    /// Extracts a point from a raw record; unparsable numbers become zero
    pub fn from_record(record: &RawRecord) -> Self {
        let text = |key| text_field(record, key).unwrap_or_default().to_string();
        let number = |key| numeric_field(record, key).or_zero();
        let leading = |key| leading_numeric_field(record, key).or_zero();

        Self {
            fin_year: text(FIN_YEAR),
            month: text(MONTH),
            district_name: text(DISTRICT_NAME),
            avg_wage: leading(AVG_WAGE),
            emp_days: number(EMP_DAYS),
            completed: number(COMPLETED_WORKS),
            ongoing: number(ONGOING_WORKS),
            total_exp: leading(TOTAL_EXP),
            women_persondays: number(WOMEN_PERSONDAYS),
        }
    }
}

/// Builds a timeline ordered by financial year, then calendar month
pub fn timeline(records: &[RawRecord]) -> Vec<DistrictPoint> {
    let mut points: Vec<DistrictPoint> = records.iter().map(DistrictPoint::from_record).collect();
    points.sort_by(|a, b| match a.fin_year.cmp(&b.fin_year) {
        Ordering::Equal => month_index(&a.month).cmp(&month_index(&b.month)),
        other => other,
    });
    points
}

/// Averages and totals for one district's timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictProfile {
    /// Mean average wage, 2 decimals
    pub avg_wage: f64,
    /// Mean employment days, 2 decimals
    pub emp_days: f64,
    pub completed: f64,
    pub ongoing: f64,
    /// Total expenditure, 2 decimals
    pub total_exp: f64,
    pub women_persondays: f64,
}

impl DistrictProfile {
    /// Summarises a timeline; `None` when there are no points
    pub fn from_points(points: &[DistrictPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let total = |f: fn(&DistrictPoint) -> f64| points.iter().map(f).sum::<f64>();
        let mean = |f: fn(&DistrictPoint) -> f64| round_to(total(f) / points.len() as f64, 2);

        Some(Self {
            avg_wage: mean(|p| p.avg_wage),
            emp_days: mean(|p| p.emp_days),
            completed: total(|p| p.completed),
            ongoing: total(|p| p.ongoing),
            total_exp: round_to(total(|p| p.total_exp), 2),
            women_persondays: total(|p| p.women_persondays),
        })
    }

    /// Labelled rows in display order
    pub fn rows(&self) -> [(&'static str, String); 6] {
        [
            ("AVG WAGE", format!("{:.2}", self.avg_wage)),
            ("EMP DAYS", format!("{:.2}", self.emp_days)),
            ("COMPLETED", format_count(self.completed)),
            ("ONGOING", format_count(self.ongoing)),
            ("TOTAL EXP", format!("{:.2}", self.total_exp)),
            ("WOMEN PERSONDAYS", format_count(self.women_persondays)),
        ]
    }
}

/// Prints whole numbers without a fractional part
fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Women's share of employment persondays as a sentence
///
/// Returns `None` for an empty timeline.
pub fn insight(district: &str, points: &[DistrictPoint]) -> Option<String> {
    if points.is_empty() {
        return None;
    }
    let women: f64 = points.iter().map(|p| p.women_persondays).sum();
    let emp: f64 = points.iter().map(|p| p.emp_days).sum();
    let percent = if emp != 0.0 {
        to_fixed(women / emp * 100.0, 1)
    } else {
        "0".to_string()
    };

    Some(format!(
        "In {}, women contributed approximately {}% of total employment persondays.",
        district, percent
    ))
}

/// Renders two profiles as an aligned three-column table
pub fn render_table(
    district_a: &str,
    profile_a: &DistrictProfile,
    district_b: &str,
    profile_b: &DistrictProfile,
) -> String {
    let rows_a = profile_a.rows();
    let rows_b = profile_b.rows();

    let label_width = rows_a
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let width_a = rows_a
        .iter()
        .map(|(_, v)| v.chars().count())
        .chain(std::iter::once(district_a.chars().count()))
        .max()
        .unwrap_or(0);
    let width_b = rows_b
        .iter()
        .map(|(_, v)| v.chars().count())
        .chain(std::iter::once(district_b.chars().count()))
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{:<lw$}  {:>wa$}  {:>wb$}\n",
        "",
        district_a,
        district_b,
        lw = label_width,
        wa = width_a,
        wb = width_b
    );
    for ((label, a), (_, b)) in rows_a.iter().zip(rows_b.iter()) {
        out.push_str(&format!(
            "{:<lw$}  {:>wa$}  {:>wb$}\n",
            label,
            a,
            b,
            lw = label_width,
            wa = width_a,
            wb = width_b
        ));
    }
    out
}
