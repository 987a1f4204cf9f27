use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::data::BillingRecord;

/// Records older than this many days before the reference date are "aged"
pub const AGED_AFTER_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// The twelve months trailing the reference date
    Recent,
    /// Everything before that
    Aged,
}

/// The recent/aged split around one reference date.
///
/// A single cutoff serves both windows, so every record dated on or before
/// the reference falls into exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Windows {
    pub reference: NaiveDate,
    pub cutoff: NaiveDate,
}

impl Windows {
    /// `None` when the cutoff would fall before the earliest representable
    /// date
    pub fn new(reference: NaiveDate) -> Option<Self> {
        let cutoff = reference.checked_sub_signed(Duration::days(AGED_AFTER_DAYS))?;
        Some(Self { reference, cutoff })
    }

    /// Windows anchored at the most recent attendance date
    pub fn latest<'a, I>(records: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a BillingRecord>,
    {
        records
            .into_iter()
            .map(|r| r.attendance_date)
            .max()
            .and_then(Self::new)
    }

    /// `None` for dates after the reference date
    pub fn classify(&self, date: NaiveDate) -> Option<Window> {
        if date > self.reference {
            None
        } else if date >= self.cutoff {
            Some(Window::Recent)
        } else {
            Some(Window::Aged)
        }
    }

    pub fn contains(&self, window: Window, date: NaiveDate) -> bool {
        self.classify(date) == Some(window)
    }
}
