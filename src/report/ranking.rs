use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::data::BillingRecord;

/// Default number of rows in a ranked table
pub const TOP_N: usize = 15;

/// A patient's position in a ranked table: the outstanding amount summed over
/// the window, displayed next to the fields of their latest attendance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    pub patient_id: String,
    pub outstanding: f64,
    pub attendance_type: String,
    pub attendance_date: NaiveDate,
    pub record_type: String,
    pub company: Option<String>,
    /// Records summed into `outstanding`
    pub records: usize,
}

impl RankedRow {
    /// `MM/YYYY` of the latest attendance, the form stored with case notes
    pub fn month_label(&self) -> String {
        self.attendance_date.format("%m/%Y").to_string()
    }
}

/// Per-patient outstanding sum, in order of first appearance
#[derive(Debug, Clone, PartialEq)]
pub struct PatientTotal<'a> {
    pub patient_id: &'a str,
    pub outstanding: f64,
    pub records: usize,
}

/// Group by patient and sum the outstanding amount. Records without a
/// patient id are ignored.
pub fn sum_by_patient<'a>(records: &[&'a BillingRecord]) -> Vec<PatientTotal<'a>> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<PatientTotal<'a>> = Vec::new();

    for &record in records {
        if record.patient_id.is_empty() {
            continue;
        }
        match positions.get(record.patient_id.as_str()) {
            Some(&idx) => {
                totals[idx].outstanding += record.outstanding;
                totals[idx].records += 1;
            }
            None => {
                positions.insert(record.patient_id.as_str(), totals.len());
                totals.push(PatientTotal {
                    patient_id: &record.patient_id,
                    outstanding: record.outstanding,
                    records: 1,
                });
            }
        }
    }

    totals
}

/// Each patient's most recent record by attendance date. On equal dates the
/// earlier record in the input wins.
pub fn latest_by_patient<'a>(records: &[&'a BillingRecord]) -> HashMap<&'a str, &'a BillingRecord> {
    let mut latest: HashMap<&'a str, &'a BillingRecord> = HashMap::new();
    for &record in records.iter().filter(|r| !r.patient_id.is_empty()) {
        latest
            .entry(record.patient_id.as_str())
            .and_modify(|current| {
                if record.attendance_date > current.attendance_date {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest
}

/// Rank patients by summed outstanding amount, descending, keeping at most
/// `limit` rows. Ties keep input order.
pub fn rank_top(records: &[&BillingRecord], limit: usize) -> Vec<RankedRow> {
    let latest = latest_by_patient(records);

    let mut rows: Vec<RankedRow> = sum_by_patient(records)
        .into_iter()
        .filter_map(|total| {
            let display = latest.get(total.patient_id)?;
            Some(RankedRow {
                patient_id: total.patient_id.to_string(),
                outstanding: total.outstanding,
                attendance_type: display.attendance_type.clone(),
                attendance_date: display.attendance_date,
                record_type: display.record_type.clone(),
                company: display.company.clone(),
                records: total.records,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.outstanding.total_cmp(&a.outstanding));
    rows.truncate(limit);
    rows
}
