//! Per-district aggregation of raw upstream records
//!
//! A single pass groups records by upper-cased district name and accumulates
//! running totals; a second pass turns the totals into rounded summaries.
//! Numeric fields are parsed best-effort: wage and expenditure take the leading
//! number of a string, the day counts must be numbers in full. Anything
//! unparsable contributes zero and is counted in [`ParseFailures`].

use std::collections::HashMap;

use serde::Serialize;

use super::{
    district_name, leading_numeric_field, numeric_field, round_to, DistrictSummary, RawRecord, AVG_WAGE, EMP_DAYS,
    TOTAL_EXP, WOMEN_PERSONDAYS,
};

/// Counts of present-but-unparsable values, per aggregated field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseFailures {
    pub avg_wage: u64,
    pub total_exp: u64,
    pub emp_days: u64,
    pub women_persondays: u64,
}

impl ParseFailures {
    pub fn total(&self) -> u64 {
        self.avg_wage + self.total_exp + self.emp_days + self.women_persondays
    }
}

/// Result of aggregating one batch of records
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Summaries in first-seen district order
    pub summaries: Vec<DistrictSummary>,
    pub parse_failures: ParseFailures,
}

/// Running totals for one district
#[derive(Debug, Default)]
struct Totals {
    count: u64,
    wage_sum: f64,
    exp_sum: f64,
    emp_days_sum: f64,
    women_sum: f64,
}

impl Totals {
    fn into_summary(self, district: String) -> DistrictSummary {
        let avg_wage = if self.count > 0 {
            self.wage_sum / self.count as f64
        } else {
            0.0
        };
        let women_percent = if self.emp_days_sum != 0.0 {
            self.women_sum / self.emp_days_sum * 100.0
        } else {
            0.0
        };

        DistrictSummary {
            district,
            avg_wage: round_to(avg_wage, 2),
            total_exp: round_to(self.exp_sum, 2),
            total_emp_days: self.emp_days_sum,
            women_persondays: self.women_sum,
            women_percent: round_to(women_percent, 1),
            samples: self.count,
        }
    }
}

/// Builds the district summary set for a batch of raw records
///
/// Records without a district name are skipped. Output order follows the
/// first appearance of each district in `records`.
pub fn aggregate(records: &[RawRecord]) -> Aggregation {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, Totals> = HashMap::new();
    let mut failures = ParseFailures::default();

    for record in records {
        let Some(name) = district_name(record) else {
            continue;
        };
        let key = name.to_uppercase();

        let wage = leading_numeric_field(record, AVG_WAGE);
        let exp = leading_numeric_field(record, TOTAL_EXP);
        let emp_days = numeric_field(record, EMP_DAYS);
        let women = numeric_field(record, WOMEN_PERSONDAYS);

        failures.avg_wage += wage.is_invalid() as u64;
        failures.total_exp += exp.is_invalid() as u64;
        failures.emp_days += emp_days.is_invalid() as u64;
        failures.women_persondays += women.is_invalid() as u64;

        let entry = totals.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Totals::default()
        });
        entry.count += 1;
        entry.wage_sum += wage.or_zero();
        entry.exp_sum += exp.or_zero();
        entry.emp_days_sum += emp_days.or_zero();
        entry.women_sum += women.or_zero();
    }

    if failures.total() > 0 {
        tracing::warn!(
            avg_wage = failures.avg_wage,
            total_exp = failures.total_exp,
            emp_days = failures.emp_days,
            women_persondays = failures.women_persondays,
            "Unparsable numeric fields counted as zero"
        );
    }

    let summaries = order
        .into_iter()
        .filter_map(|district| {
            totals
                .remove(&district)
                .map(|t| t.into_summary(district))
        })
        .collect();

    Aggregation {
        summaries,
        parse_failures: failures,
    }
}
