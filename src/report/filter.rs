use serde::Serialize;

use crate::data::{BillingRecord, MonthlyTotal};

/// Year/company selection applied to every report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub year: Option<i32>,
    pub company: Option<String>,
}

impl Filter {
    pub fn new(year: Option<i32>, company: Option<String>) -> Self {
        Self { year, company }
    }

    /// The same selection without the year, used by the "older than" and
    /// annual views
    pub fn company_only(&self) -> Self {
        Self {
            year: None,
            company: self.company.clone(),
        }
    }

    pub fn matches(&self, record: &BillingRecord) -> bool {
        self.year.map_or(true, |y| record.year == y)
            && company_matches(self.company.as_deref(), record.company.as_deref())
    }

    pub fn matches_total(&self, total: &MonthlyTotal) -> bool {
        self.year.map_or(true, |y| total.year == y)
            && company_matches(self.company.as_deref(), total.company.as_deref())
    }

    pub fn apply<'a>(&self, records: &'a [BillingRecord]) -> Vec<&'a BillingRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

// A source without the company column cannot be narrowed by company
fn company_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match (wanted, actual) {
        (Some(w), Some(a)) => w == a,
        _ => true,
    }
}
