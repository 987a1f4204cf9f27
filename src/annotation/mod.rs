mod store;

pub use store::AnnotationStore;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::report::RankedRow;

/// How a stored note is matched to a ranked row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinKey {
    /// Patient id only
    Patient,
    /// Patient id and the `MM/YYYY` of the displayed attendance
    PatientAndDate,
}

/// A case note kept next to one ranked patient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "cd_paciente")]
    pub patient_id: String,
    #[serde(rename = "dt_atendimento", default)]
    pub attendance_month: Option<String>,
    #[serde(rename = "causa", default)]
    pub cause: String,
    #[serde(rename = "status_atual", default)]
    pub status: String,
}

impl Annotation {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            ..Default::default()
        }
    }

    pub fn with_month(mut self, month: &str) -> Self {
        self.attendance_month = Some(month.to_string());
        self
    }

    pub fn with_cause(mut self, cause: &str) -> Self {
        self.cause = cause.to_string();
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn is_blank(&self) -> bool {
        self.cause.trim().is_empty() && self.status.trim().is_empty()
    }

    fn key(&self, join: JoinKey) -> (String, Option<String>) {
        let month = match join {
            JoinKey::Patient => None,
            JoinKey::PatientAndDate => Some(self.attendance_month.clone().unwrap_or_default()),
        };
        (self.patient_id.clone(), month)
    }
}

/// A ranked row with its case note columns filled in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedRow {
    #[serde(flatten)]
    pub row: RankedRow,
    pub cause: String,
    pub status: String,
}

impl AnnotatedRow {
    /// The note to store for this row
    pub fn to_annotation(&self) -> Annotation {
        Annotation {
            patient_id: self.row.patient_id.clone(),
            attendance_month: Some(self.row.month_label()),
            cause: self.cause.clone(),
            status: self.status.clone(),
        }
    }
}

fn row_key(row: &RankedRow, join: JoinKey) -> (String, Option<String>) {
    let month = match join {
        JoinKey::Patient => None,
        JoinKey::PatientAndDate => Some(row.month_label()),
    };
    (row.patient_id.clone(), month)
}

/// Left-join notes onto ranked rows. Rows without a note get empty strings.
/// The first note for a key wins, and notes with neither cause nor status
/// are ignored.
pub fn merge_annotations(
    rows: Vec<RankedRow>,
    annotations: &[Annotation],
    join: JoinKey,
) -> Vec<AnnotatedRow> {
    let mut notes: HashMap<(String, Option<String>), &Annotation> = HashMap::new();
    for annotation in annotations.iter().filter(|a| !a.is_blank()) {
        notes.entry(annotation.key(join)).or_insert(annotation);
    }

    rows.into_iter()
        .map(|row| {
            let (cause, status) = notes
                .get(&row_key(&row, join))
                .map(|a| (a.cause.clone(), a.status.clone()))
                .unwrap_or_default();
            AnnotatedRow { row, cause, status }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BillingRecord;
    use crate::report::rank_top;
    use chrono::NaiveDate;

    fn ranked() -> Vec<RankedRow> {
        let records = vec![
            BillingRecord::new("p1", NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(), 100.0),
            BillingRecord::new("p2", NaiveDate::from_ymd_opt(2024, 4, 9).unwrap(), 50.0),
        ];
        let refs: Vec<&BillingRecord> = records.iter().collect();
        rank_top(&refs, 15)
    }

    #[test]
    fn rows_without_notes_get_empty_strings() {
        let merged = merge_annotations(ranked(), &[], JoinKey::Patient);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|r| r.cause.is_empty() && r.status.is_empty()));
    }

    #[test]
    fn note_merges_into_matching_patient() {
        let notes = vec![Annotation::new("p1").with_cause("disputed")];
        let merged = merge_annotations(ranked(), &notes, JoinKey::Patient);
        assert_eq!(merged[0].row.patient_id, "p1");
        assert_eq!(merged[0].cause, "disputed");
        assert_eq!(merged[0].status, "");
        assert_eq!(merged[1].cause, "");
    }

    #[test]
    fn date_keyed_join_needs_matching_month() {
        let notes = vec![
            Annotation::new("p1").with_month("04/2024").with_cause("stale"),
            Annotation::new("p2").with_month("04/2024").with_status("in collection"),
        ];
        let merged = merge_annotations(ranked(), &notes, JoinKey::PatientAndDate);
        assert_eq!(merged[0].cause, "");
        assert_eq!(merged[1].status, "in collection");

        let by_patient = merge_annotations(ranked(), &notes, JoinKey::Patient);
        assert_eq!(by_patient[0].cause, "stale");
    }

    #[test]
    fn first_note_wins_and_blank_notes_are_ignored() {
        let notes = vec![
            Annotation::new("p1"),
            Annotation::new("p1").with_cause("first"),
            Annotation::new("p1").with_cause("second"),
        ];
        let merged = merge_annotations(ranked(), &notes, JoinKey::Patient);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].cause, "first");
    }

    #[test]
    fn annotated_row_stores_its_month() {
        let merged = merge_annotations(ranked(), &[], JoinKey::Patient);
        let note = merged[0].to_annotation();
        assert_eq!(note.patient_id, "p1");
        assert_eq!(note.attendance_month.as_deref(), Some("05/2024"));
    }
}
