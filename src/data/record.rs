use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Account lifecycle flag from the `sn_fechada` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    /// `S`: the account was closed and billed, the balance is delinquent
    Closed,
    /// `N`: the patient was discharged but the account is still open
    Open,
}

impl AccountState {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_uppercase().as_str() {
            "S" => Some(Self::Closed),
            "N" => Some(Self::Open),
            _ => None,
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            Self::Closed => "S",
            Self::Open => "N",
        }
    }
}

impl std::fmt::Display for AccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// One row of the detail extract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingRecord {
    pub patient_id: String,
    pub attendance_date: NaiveDate,
    pub attendance_type: String,
    pub state: Option<AccountState>,
    pub company: Option<String>,
    pub outstanding: f64,
    pub record_type: String,
    pub account_total: Option<f64>,
    pub invoiced: Option<f64>,
    pub received: Option<f64>,
    pub year: i32,
    /// `YYYY-MM`
    pub month: String,
}

impl BillingRecord {
    /// Build a record with the derived year/month columns filled in
    pub fn new(patient_id: impl Into<String>, attendance_date: NaiveDate, outstanding: f64) -> Self {
        Self {
            patient_id: patient_id.into(),
            attendance_date,
            attendance_type: String::new(),
            state: None,
            company: None,
            outstanding,
            record_type: String::new(),
            account_total: None,
            invoiced: None,
            received: None,
            year: attendance_date.year(),
            month: month_key(attendance_date),
        }
    }

    pub fn with_type(mut self, attendance_type: &str) -> Self {
        self.attendance_type = attendance_type.to_string();
        self
    }

    pub fn with_state(mut self, state: AccountState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    pub fn with_record_type(mut self, record_type: &str) -> Self {
        self.record_type = record_type.to_string();
        self
    }
}

/// One row of the monthly reference totals extract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// First day of the month
    pub month_start: NaiveDate,
    /// `YYYY-MM`
    pub month: String,
    pub year: i32,
    pub company: Option<String>,
    pub amount: f64,
    pub accounts: f64,
}

impl MonthlyTotal {
    pub fn new(month_start: NaiveDate, amount: f64, accounts: f64) -> Self {
        Self {
            month_start,
            month: month_key(month_start),
            year: month_start.year(),
            company: None,
            amount,
            accounts,
        }
    }

    pub fn with_company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }
}

/// `YYYY-MM` bucket of a date
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_flag_is_case_insensitive() {
        assert_eq!(AccountState::from_flag("s"), Some(AccountState::Closed));
        assert_eq!(AccountState::from_flag(" N "), Some(AccountState::Open));
        assert_eq!(AccountState::from_flag("?"), None);
    }

    #[test]
    fn derived_columns_follow_attendance_date() {
        let date = NaiveDate::from_ymd_opt(2023, 7, 9).unwrap();
        let record = BillingRecord::new("42", date, 10.0);
        assert_eq!(record.year, 2023);
        assert_eq!(record.month, "2023-07");
    }
}
