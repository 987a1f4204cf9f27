use chrono::Months;
use serde::Serialize;
use std::collections::BTreeMap;

use super::filter::Filter;
use crate::data::{BillingRecord, MonthlyTotal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Year,
}

impl Granularity {
    fn period_of(self, record: &BillingRecord) -> String {
        match self {
            Self::Month => record.month.clone(),
            Self::Year => record.year.to_string(),
        }
    }
}

/// `part / whole * 100`, or 0 when the whole is missing or zero
pub fn percentage(part: f64, whole: Option<f64>) -> f64 {
    match whole {
        Some(w) if w != 0.0 => part / w * 100.0,
        _ => 0.0,
    }
}

/// Reference billing volume per period, from the monthly totals extract
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceSeries {
    pub periods: BTreeMap<String, ReferenceTotal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReferenceTotal {
    pub amount: f64,
    pub accounts: f64,
}

impl ReferenceSeries {
    /// Months matching `filter`, limited to the twelve months trailing the
    /// latest month present.
    pub fn monthly(totals: &[MonthlyTotal], filter: &Filter) -> Self {
        let scoped: Vec<&MonthlyTotal> = totals.iter().filter(|t| filter.matches_total(t)).collect();
        let Some(latest) = scoped.iter().map(|t| t.month_start).max() else {
            return Self::default();
        };
        let since = latest.checked_sub_months(Months::new(12)).unwrap_or(latest);

        Self::group(
            scoped.into_iter().filter(|t| t.month_start >= since),
            |t| t.month.clone(),
        )
    }

    /// Years matching the company part of `filter`
    pub fn annual(totals: &[MonthlyTotal], filter: &Filter) -> Self {
        let filter = filter.company_only();
        Self::group(
            totals.iter().filter(|t| filter.matches_total(t)),
            |t| t.year.to_string(),
        )
    }

    fn group<'a>(
        totals: impl Iterator<Item = &'a MonthlyTotal>,
        period_of: impl Fn(&MonthlyTotal) -> String,
    ) -> Self {
        let mut periods: BTreeMap<String, ReferenceTotal> = BTreeMap::new();
        for total in totals {
            let entry = periods.entry(period_of(total)).or_default();
            entry.amount += total.amount;
            entry.accounts += total.accounts;
        }
        Self { periods }
    }

    pub fn get(&self, period: &str) -> Option<ReferenceTotal> {
        self.periods.get(period).copied()
    }

    pub fn total(&self) -> ReferenceTotal {
        self.periods.values().fold(ReferenceTotal::default(), |acc, t| ReferenceTotal {
            amount: acc.amount + t.amount,
            accounts: acc.accounts + t.accounts,
        })
    }
}

/// One stacked-bar segment: a period and attendance type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub period: String,
    pub attendance_type: String,
    pub amount: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeTotal {
    pub attendance_type: String,
    pub amount: f64,
    pub count: usize,
}

/// Extra-charge records inside one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraCharge {
    pub amount: f64,
    pub count: usize,
    pub amount_pct: f64,
    pub count_pct: f64,
}

/// One bar: a period total with its overlay percentages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotal {
    pub period: String,
    pub amount: f64,
    pub count: usize,
    pub reference: Option<ReferenceTotal>,
    pub amount_pct: f64,
    pub count_pct: f64,
    pub extra: Option<ExtraCharge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
    pub granularity: Granularity,
    pub buckets: Vec<Bucket>,
    pub periods: Vec<PeriodTotal>,
    pub by_type: Vec<TypeTotal>,
    pub total_amount: f64,
    pub total_count: usize,
    /// Whether a reference series was supplied
    pub has_reference: bool,
    pub amount_pct: f64,
    pub count_pct: f64,
}

impl Rollup {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[derive(Default)]
struct Acc {
    amount: f64,
    count: usize,
}

impl Acc {
    fn add(&mut self, amount: f64) {
        self.amount += amount;
        self.count += 1;
    }
}

/// Month-by-type breakdown of a window
pub fn monthly_rollup(records: &[&BillingRecord], reference: Option<&ReferenceSeries>) -> Rollup {
    build(records, Granularity::Month, reference, None)
}

/// Year-by-type breakdown of records with a positive outstanding amount,
/// with extra-charge records broken out when `extra_charge_tag` is given
pub fn annual_rollup(
    records: &[&BillingRecord],
    reference: Option<&ReferenceSeries>,
    extra_charge_tag: Option<&str>,
) -> Rollup {
    let positive: Vec<&BillingRecord> = records
        .iter()
        .copied()
        .filter(|r| r.outstanding > 0.0)
        .collect();
    build(&positive, Granularity::Year, reference, extra_charge_tag)
}

fn build(
    records: &[&BillingRecord],
    granularity: Granularity,
    reference: Option<&ReferenceSeries>,
    extra_charge_tag: Option<&str>,
) -> Rollup {
    let mut buckets: BTreeMap<(String, String), Acc> = BTreeMap::new();
    let mut periods: BTreeMap<String, Acc> = BTreeMap::new();
    let mut extras: BTreeMap<String, Acc> = BTreeMap::new();
    let mut types: BTreeMap<String, Acc> = BTreeMap::new();

    for record in records {
        let period = granularity.period_of(record);
        buckets
            .entry((period.clone(), record.attendance_type.clone()))
            .or_default()
            .add(record.outstanding);
        types
            .entry(record.attendance_type.clone())
            .or_default()
            .add(record.outstanding);
        if extra_charge_tag.is_some_and(|tag| record.record_type == tag) {
            extras.entry(period.clone()).or_default().add(record.outstanding);
        }
        periods.entry(period).or_default().add(record.outstanding);
    }

    let periods: Vec<PeriodTotal> = periods
        .into_iter()
        .map(|(period, acc)| {
            let reference_total = reference.and_then(|r| r.get(&period));
            let extra = extras.get(&period).map(|e| ExtraCharge {
                amount: e.amount,
                count: e.count,
                amount_pct: percentage(e.amount, Some(acc.amount)),
                count_pct: percentage(e.count as f64, Some(acc.count as f64)),
            });
            PeriodTotal {
                amount_pct: percentage(acc.amount, reference_total.map(|r| r.amount)),
                count_pct: percentage(acc.count as f64, reference_total.map(|r| r.accounts)),
                period,
                amount: acc.amount,
                count: acc.count,
                reference: reference_total,
                extra,
            }
        })
        .collect();

    let total_amount: f64 = periods.iter().map(|p| p.amount).sum();
    let total_count: usize = periods.iter().map(|p| p.count).sum();
    let reference_total = reference.map(|r| r.total());

    Rollup {
        granularity,
        buckets: buckets
            .into_iter()
            .map(|((period, attendance_type), acc)| Bucket {
                period,
                attendance_type,
                amount: acc.amount,
                count: acc.count,
            })
            .collect(),
        periods,
        by_type: types
            .into_iter()
            .map(|(attendance_type, acc)| TypeTotal {
                attendance_type,
                amount: acc.amount,
                count: acc.count,
            })
            .collect(),
        total_amount,
        total_count,
        has_reference: reference.is_some(),
        amount_pct: percentage(total_amount, reference_total.map(|r| r.amount)),
        count_pct: percentage(total_count as f64, reference_total.map(|r| r.accounts)),
    }
}
