use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::filter::Filter;
use super::ranking::{rank_top, RankedRow};
use super::rollup::{annual_rollup, monthly_rollup, ReferenceSeries, Rollup};
use super::summary::{year_summary, SummaryRow};
use super::variant::ReportVariant;
use super::window::{Window, Windows};
use crate::annotation::{merge_annotations, AnnotatedRow, AnnotationStore};
use crate::config::Settings;
use crate::data::{
    AccountState, BillingRecord, Dataset, Loader, MonthlyTotal, CLOSED_FLAG, COMPANY, OUTSTANDING,
    RECORD_TYPE,
};
use crate::error::{DelinquencyError, Result};

/// Outcome of reading the monthly totals file
#[derive(Debug, Clone, Default)]
pub enum ReferenceTotals {
    #[default]
    Missing,
    Loaded(Vec<MonthlyTotal>),
    Unreadable(String),
}

impl ReferenceTotals {
    /// Read the totals file; failures are logged and kept as `Unreadable`
    pub fn load(loader: &Loader) -> Self {
        match loader.load_totals() {
            Ok(Some(totals)) => Self::Loaded(totals),
            Ok(None) => Self::Missing,
            Err(e) => {
                warn!(error = %e, "monthly totals unavailable, percentages skipped");
                Self::Unreadable(e.to_string())
            }
        }
    }

    pub fn as_slice(&self) -> Option<&[MonthlyTotal]> {
        match self {
            Self::Loaded(totals) => Some(totals),
            _ => None,
        }
    }
}

/// A ranked table with its case notes merged in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTable {
    pub variant: ReportVariant,
    pub title: &'static str,
    pub rows: Vec<AnnotatedRow>,
}

/// Everything one report run is computed from: the loaded data, the filter
/// selection and an optional fixed reference date.
pub struct ReportContext<'a> {
    pub dataset: &'a Dataset,
    pub totals: &'a ReferenceTotals,
    pub settings: &'a Settings,
    pub filter: Filter,
    pub as_of: Option<NaiveDate>,
}

impl<'a> ReportContext<'a> {
    pub fn new(dataset: &'a Dataset, totals: &'a ReferenceTotals, settings: &'a Settings) -> Self {
        Self {
            dataset,
            totals,
            settings,
            filter: Filter::default(),
            as_of: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_as_of(mut self, as_of: Option<NaiveDate>) -> Self {
        self.as_of = as_of;
        self
    }

    /// Records under the full year and company selection
    pub fn recent_scope(&self) -> Vec<&'a BillingRecord> {
        self.filter.apply(&self.dataset.records)
    }

    /// Records under the company selection only
    pub fn company_scope(&self) -> Vec<&'a BillingRecord> {
        self.filter.company_only().apply(&self.dataset.records)
    }

    /// Windows anchored at `as_of`, else at the latest filtered attendance.
    /// All four tables share them.
    pub fn windows(&self) -> Option<Windows> {
        match self.as_of {
            Some(date) => Windows::new(date),
            None => Windows::latest(self.recent_scope()),
        }
    }

    /// State-bearing sections cannot be built without the closed flag
    pub fn require_state(&self) -> Result<()> {
        if self.dataset.columns.state {
            Ok(())
        } else {
            Err(DelinquencyError::MissingColumn {
                path: self.dataset.source.clone(),
                column: CLOSED_FLAG.to_string(),
            })
        }
    }

    /// Degradations caused by the extract itself: absent optional columns
    /// and a company filter that cannot apply
    pub fn warnings(&self) -> Vec<String> {
        let columns = &self.dataset.columns;
        let mut warnings: Vec<String> = columns
            .missing()
            .into_iter()
            .map(|column| match column {
                OUTSTANDING => {
                    format!("Column '{column}' is missing from the detail extract; amounts are zero")
                }
                RECORD_TYPE => format!(
                    "Column '{column}' is missing from the detail extract; extra charges are not broken out"
                ),
                _ => format!("Column '{column}' is missing from the detail extract"),
            })
            .collect();
        if self.filter.company.is_some() && !columns.company {
            warnings.push(format!("Company filter ignored: '{COMPANY}' column is missing"));
        }
        warnings
    }

    fn windowed(&self, window: Window, state: AccountState) -> Vec<&'a BillingRecord> {
        let Some(windows) = self.windows() else {
            return Vec::new();
        };
        let scope = match window {
            Window::Recent => self.recent_scope(),
            Window::Aged => self.company_scope(),
        };
        scope
            .into_iter()
            .filter(|r| r.state == Some(state) && windows.contains(window, r.attendance_date))
            .collect()
    }

    pub fn variant_records(&self, variant: ReportVariant) -> Vec<&'a BillingRecord> {
        self.windowed(variant.window(), variant.state())
    }

    pub fn ranked(&self, variant: ReportVariant) -> Vec<RankedRow> {
        rank_top(&self.variant_records(variant), self.settings.top_n)
    }

    pub fn top_table(&self, variant: ReportVariant, store: &AnnotationStore) -> RankedTable {
        let notes = store.load(variant);
        RankedTable {
            variant,
            title: variant.title(),
            rows: merge_annotations(self.ranked(variant), &notes, variant.join_key()),
        }
    }

    /// Recent-window breakdown by month and attendance type
    pub fn monthly(&self, state: AccountState) -> Rollup {
        let reference = self
            .totals
            .as_slice()
            .map(|totals| ReferenceSeries::monthly(totals, &self.filter));
        monthly_rollup(&self.windowed(Window::Recent, state), reference.as_ref())
    }

    /// Breakdown by year and attendance type over the company selection
    pub fn annual(&self, state: AccountState) -> Rollup {
        let records: Vec<&BillingRecord> = self
            .company_scope()
            .into_iter()
            .filter(|r| r.state == Some(state))
            .collect();
        let reference = self
            .totals
            .as_slice()
            .map(|totals| ReferenceSeries::annual(totals, &self.filter));
        let tag = self
            .dataset
            .columns
            .record_type
            .then_some(self.settings.extra_charge_tag.as_str());
        annual_rollup(&records, reference.as_ref(), tag)
    }

    pub fn summary(&self) -> Vec<SummaryRow> {
        year_summary(&self.recent_scope())
    }
}
