use csv::StringRecord;
use encoding_rs::Encoding;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::parse::{normalize_code, parse_day_first, parse_decimal, parse_month};
use super::record::{AccountState, BillingRecord, MonthlyTotal};
use crate::config::Settings;
use crate::error::{DelinquencyError, Result};

// Detail extract column contract
pub const PATIENT_ID: &str = "cd_paciente";
pub const ATTENDANCE_DATE: &str = "dt_atendimento";
pub const ATTENDANCE_TYPE: &str = "tp_atendimento";
pub const CLOSED_FLAG: &str = "sn_fechada";
pub const COMPANY: &str = "cd_multi_empresa";
pub const OUTSTANDING: &str = "vl_em_aberto";
pub const RECORD_TYPE: &str = "tipo";
pub const ACCOUNT_TOTAL: &str = "vl_total_conta";
pub const INVOICED: &str = "vl_duplicata";
pub const RECEIVED: &str = "vl_soma_recebido";

// Monthly totals column contract
pub const TOTALS_MONTH: &str = "mes_ano";
pub const TOTALS_AMOUNT: &str = "vl_total";
pub const TOTALS_AMOUNT_ALT: &str = "valor";
pub const TOTALS_ACCOUNTS: &str = "qtd_contas";

/// Which optional detail columns were present in the extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Columns {
    pub state: bool,
    pub company: bool,
    pub outstanding: bool,
    pub attendance_type: bool,
    pub record_type: bool,
}

impl Columns {
    pub fn all() -> Self {
        Self {
            state: true,
            company: true,
            outstanding: true,
            attendance_type: true,
            record_type: true,
        }
    }

    /// Names of the optional columns the extract lacked
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.state, CLOSED_FLAG),
            (self.company, COMPANY),
            (self.outstanding, OUTSTANDING),
            (self.attendance_type, ATTENDANCE_TYPE),
            (self.record_type, RECORD_TYPE),
        ]
        .into_iter()
        .filter(|(present, _)| !present)
        .map(|(_, name)| name)
        .collect()
    }
}

/// The loaded detail extract
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    pub records: Vec<BillingRecord>,
    pub columns: Columns,
    /// Rows skipped because their attendance date did not parse
    pub dropped_rows: usize,
}

impl Dataset {
    pub fn new(records: Vec<BillingRecord>) -> Self {
        Self {
            source: PathBuf::new(),
            records,
            columns: Columns::all(),
            dropped_rows: 0,
        }
    }

    /// Distinct attendance years, ascending
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Distinct company codes, ascending
    pub fn companies(&self) -> Vec<String> {
        let mut companies: Vec<String> = self
            .records
            .iter()
            .filter_map(|r| r.company.clone())
            .collect();
        companies.sort();
        companies.dedup();
        companies
    }

    pub fn date_range(&self) -> Option<(chrono::NaiveDate, chrono::NaiveDate)> {
        let first = self.records.iter().map(|r| r.attendance_date).min()?;
        let last = self.records.iter().map(|r| r.attendance_date).max()?;
        Some((first, last))
    }
}

/// Reads the two extracts out of the configured data directory
pub struct Loader<'a> {
    settings: &'a Settings,
}

impl<'a> Loader<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// The monthly totals file, looked up by exact name
    pub fn find_totals_file(&self) -> Option<PathBuf> {
        let path = self.settings.totals_path();
        path.is_file().then_some(path)
    }

    /// The first `.csv` in the data directory that is not the totals file
    pub fn find_detail_file(&self) -> Option<PathBuf> {
        let entries = fs::read_dir(&self.settings.data_dir).ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("csv"))
            .filter(|path| {
                path.file_name().and_then(|n| n.to_str()) != Some(self.settings.totals_file.as_str())
            })
            .collect();
        candidates.sort();
        debug!(candidates = candidates.len(), dir = %self.settings.data_dir.display(), "detail file lookup");
        candidates.into_iter().next()
    }

    pub fn load_detail(&self) -> Result<Dataset> {
        let path = self
            .find_detail_file()
            .ok_or_else(|| DelinquencyError::DetailFileNotFound(self.settings.data_dir.clone()))?;
        let table = Table::read(&path, self.settings.encoding)?;

        let patient_col = table.require(PATIENT_ID)?;
        let date_col = table.require(ATTENDANCE_DATE)?;
        let state_col = table.index(CLOSED_FLAG);
        let company_col = table.index(COMPANY);
        let outstanding_col = table.index(OUTSTANDING);
        let type_col = table.index(ATTENDANCE_TYPE);
        let record_type_col = table.index(RECORD_TYPE);
        let total_col = table.index(ACCOUNT_TOTAL);
        let invoiced_col = table.index(INVOICED);
        let received_col = table.index(RECEIVED);

        let columns = Columns {
            state: state_col.is_some(),
            company: company_col.is_some(),
            outstanding: outstanding_col.is_some(),
            attendance_type: type_col.is_some(),
            record_type: record_type_col.is_some(),
        };

        let mut records = Vec::with_capacity(table.rows.len());
        let mut dropped_rows = 0;

        for row in &table.rows {
            let Some(date) = cell(row, Some(date_col)).and_then(parse_day_first) else {
                dropped_rows += 1;
                continue;
            };

            let patient = cell(row, Some(patient_col)).map(normalize_code).unwrap_or_default();
            let outstanding = cell(row, outstanding_col).and_then(parse_decimal).unwrap_or(0.0);

            let mut record = BillingRecord::new(patient, date, outstanding);
            record.attendance_type = text(row, type_col);
            record.record_type = text(row, record_type_col);
            record.state = cell(row, state_col).and_then(AccountState::from_flag);
            record.company = cell(row, company_col).map(normalize_code);
            record.account_total = cell(row, total_col).and_then(parse_decimal);
            record.invoiced = cell(row, invoiced_col).and_then(parse_decimal);
            record.received = cell(row, received_col).and_then(parse_decimal);
            records.push(record);
        }

        if dropped_rows > 0 {
            debug!(dropped_rows, path = %path.display(), "dropped rows with unparseable attendance dates");
        }
        info!(records = records.len(), path = %path.display(), "loaded detail extract");

        Ok(Dataset {
            source: path,
            records,
            columns,
            dropped_rows,
        })
    }

    /// `Ok(None)` when the totals file is absent
    pub fn load_totals(&self) -> Result<Option<Vec<MonthlyTotal>>> {
        let Some(path) = self.find_totals_file() else {
            return Ok(None);
        };
        let table = Table::read(&path, self.settings.encoding)?;

        let month_col = table.require(TOTALS_MONTH)?;
        let amount_col = table
            .index(TOTALS_AMOUNT)
            .or_else(|| table.index(TOTALS_AMOUNT_ALT))
            .ok_or_else(|| DelinquencyError::MissingColumn {
                path: path.clone(),
                column: TOTALS_AMOUNT.to_string(),
            })?;
        let accounts_col = table.index(TOTALS_ACCOUNTS);
        let company_col = table.index(COMPANY);

        let mut totals = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let Some(month_start) = cell(row, Some(month_col)).and_then(parse_month) else {
                continue;
            };
            let amount = cell(row, Some(amount_col)).and_then(parse_decimal).unwrap_or(0.0);
            let accounts = cell(row, accounts_col).and_then(parse_decimal).unwrap_or(0.0);

            let mut total = MonthlyTotal::new(month_start, amount, accounts);
            total.company = cell(row, company_col).map(normalize_code);
            totals.push(total);
        }

        info!(rows = totals.len(), path = %path.display(), "loaded monthly totals");
        Ok(Some(totals))
    }
}

/// A decoded CSV file with a lower-cased header index
struct Table {
    path: PathBuf,
    columns: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl Table {
    fn read(path: &Path, encoding: &'static Encoding) -> Result<Self> {
        let bytes = fs::read(path)?;
        let (text, _, _) = encoding.decode(&bytes);
        Self::parse(path, &text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self> {
        let csv_err = |source| DelinquencyError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_lowercase(), idx))
            .collect();

        let rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(csv_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            columns,
            rows,
        })
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index(name).ok_or_else(|| DelinquencyError::MissingColumn {
            path: self.path.clone(),
            column: name.to_string(),
        })
    }
}

fn cell(row: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i))
}

fn text(row: &StringRecord, idx: Option<usize>) -> String {
    cell(row, idx).map(|v| v.trim().to_string()).unwrap_or_default()
}
