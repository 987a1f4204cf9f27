use serde::Serialize;
use std::collections::BTreeMap;

use crate::data::{AccountState, BillingRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// The year, or `Total`
    pub label: String,
    pub open: f64,
    pub closed: f64,
    pub total: f64,
}

/// Outstanding amount per year split by account state, with a `Total` row
/// when more than one year is present. Records with no state count toward
/// neither side.
pub fn year_summary(records: &[&BillingRecord]) -> Vec<SummaryRow> {
    let mut years: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for record in records {
        let Some(state) = record.state else {
            continue;
        };
        let entry = years.entry(record.year).or_default();
        match state {
            AccountState::Open => entry.0 += record.outstanding,
            AccountState::Closed => entry.1 += record.outstanding,
        }
    }

    let mut rows: Vec<SummaryRow> = years
        .iter()
        .map(|(year, (open, closed))| SummaryRow {
            label: year.to_string(),
            open: *open,
            closed: *closed,
            total: open + closed,
        })
        .collect();

    if rows.len() > 1 {
        let open: f64 = rows.iter().map(|r| r.open).sum();
        let closed: f64 = rows.iter().map(|r| r.closed).sum();
        rows.push(SummaryRow {
            label: "Total".to_string(),
            open,
            closed,
            total: open + closed,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(year: i32, state: AccountState, amount: f64) -> BillingRecord {
        BillingRecord::new("p", NaiveDate::from_ymd_opt(year, 1, 1).unwrap(), amount).with_state(state)
    }

    #[test]
    fn years_from_either_side_with_total_row() {
        let records = vec![
            rec(2023, AccountState::Closed, 10.0),
            rec(2024, AccountState::Open, 5.0),
            rec(2024, AccountState::Closed, 1.0),
        ];
        let refs: Vec<&BillingRecord> = records.iter().collect();

        let rows = year_summary(&refs);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], SummaryRow { label: "2023".into(), open: 0.0, closed: 10.0, total: 10.0 });
        assert_eq!(rows[1].total, 6.0);
        assert_eq!(rows[2].label, "Total");
        assert_eq!(rows[2].open, 5.0);
        assert_eq!(rows[2].closed, 11.0);
        assert_eq!(rows[2].total, 16.0);
    }

    #[test]
    fn single_year_has_no_total_row() {
        let records = vec![rec(2024, AccountState::Open, 5.0)];
        let refs: Vec<&BillingRecord> = records.iter().collect();
        let rows = year_summary(&refs);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "2024");
    }

    #[test]
    fn empty_input_gives_no_rows() {
        assert!(year_summary(&[]).is_empty());
    }
}
