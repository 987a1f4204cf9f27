use serde::Serialize;
use tracing::warn;

use super::context::{RankedTable, ReferenceTotals, ReportContext};
use super::filter::Filter;
use super::rollup::Rollup;
use super::summary::SummaryRow;
use super::variant::ReportVariant;
use super::window::{Window, Windows};
use crate::annotation::AnnotationStore;
use crate::data::AccountState;

/// Rollups and ranked tables for one account state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSection {
    pub state: AccountState,
    pub monthly: Rollup,
    pub annual: Rollup,
    pub recent: RankedTable,
    pub aged: RankedTable,
}

impl AccountSection {
    fn build(ctx: &ReportContext, store: &AnnotationStore, state: AccountState) -> Self {
        Self {
            state,
            monthly: ctx.monthly(state),
            annual: ctx.annual(state),
            recent: ctx.top_table(ReportVariant::new(Window::Recent, state), store),
            aged: ctx.top_table(ReportVariant::new(Window::Aged, state), store),
        }
    }
}

/// The whole report for one filter selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub filter: Filter,
    pub windows: Option<Windows>,
    pub summary: Vec<SummaryRow>,
    pub closed: Option<AccountSection>,
    pub open: Option<AccountSection>,
    pub notices: Vec<String>,
    pub warnings: Vec<String>,
}

impl Dashboard {
    /// Build every section that the data allows; the rest are left out with
    /// a warning.
    pub fn build(ctx: &ReportContext, store: &AnnotationStore) -> Self {
        let mut notices = Vec::new();
        let mut warnings = ctx.warnings();

        match ctx.totals {
            ReferenceTotals::Loaded(_) => {}
            ReferenceTotals::Missing => {
                notices.push("Monthly totals file not found; percentages are not shown".to_string())
            }
            ReferenceTotals::Unreadable(e) => {
                warnings.push(format!("Monthly totals could not be read ({e}); percentages are not shown"))
            }
        }
        if ctx.dataset.dropped_rows > 0 {
            notices.push(format!(
                "{} rows skipped for unreadable attendance dates",
                ctx.dataset.dropped_rows
            ));
        }

        let summary = ctx.summary();
        let windows = ctx.windows();
        if ctx.recent_scope().is_empty() {
            warnings.push("No records found for the selected filters".to_string());
        }

        let (closed, open) = match (ctx.require_state(), windows) {
            (Err(e), _) => {
                warnings.push(format!("Account sections skipped: {e}"));
                (None, None)
            }
            (Ok(()), None) => (None, None),
            (Ok(()), Some(_)) => (
                Some(AccountSection::build(ctx, store, AccountState::Closed)),
                Some(AccountSection::build(ctx, store, AccountState::Open)),
            ),
        };

        for warning in &warnings {
            warn!("{warning}");
        }

        Self {
            filter: ctx.filter.clone(),
            windows,
            summary,
            closed,
            open,
            notices,
            warnings,
        }
    }
}
