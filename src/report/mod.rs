mod context;
mod dashboard;
mod filter;
mod ranking;
mod rollup;
mod summary;
mod variant;
mod window;

pub use context::{RankedTable, ReferenceTotals, ReportContext};
pub use dashboard::{AccountSection, Dashboard};
pub use filter::Filter;
pub use ranking::{latest_by_patient, rank_top, sum_by_patient, PatientTotal, RankedRow, TOP_N};
pub use rollup::{
    annual_rollup, monthly_rollup, percentage, Bucket, ExtraCharge, Granularity, PeriodTotal,
    ReferenceSeries, ReferenceTotal, Rollup, TypeTotal,
};
pub use summary::{year_summary, SummaryRow};
pub use variant::ReportVariant;
pub use window::{Window, Windows, AGED_AFTER_DAYS};
