use serde::Serialize;
use std::path::Path;

use super::record::BillingRecord;
use crate::error::{DelinquencyError, Result};

/// Detail row as written by `export`, keeping the extract's column names
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    cd_paciente: &'a str,
    dt_atendimento: String,
    ano: i32,
    mes: &'a str,
    tp_atendimento: &'a str,
    sn_fechada: &'a str,
    cd_multi_empresa: &'a str,
    tipo: &'a str,
    vl_em_aberto: f64,
    vl_total_conta: Option<f64>,
    vl_duplicata: Option<f64>,
    vl_soma_recebido: Option<f64>,
}

impl<'a> From<&'a BillingRecord> for ExportRow<'a> {
    fn from(record: &'a BillingRecord) -> Self {
        Self {
            cd_paciente: &record.patient_id,
            dt_atendimento: record.attendance_date.format("%d/%m/%Y").to_string(),
            ano: record.year,
            mes: &record.month,
            tp_atendimento: &record.attendance_type,
            sn_fechada: record.state.map(|s| s.flag()).unwrap_or(""),
            cd_multi_empresa: record.company.as_deref().unwrap_or(""),
            tipo: &record.record_type,
            vl_em_aberto: record.outstanding,
            vl_total_conta: record.account_total,
            vl_duplicata: record.invoiced,
            vl_soma_recebido: record.received,
        }
    }
}

/// Write records to a UTF-8 CSV file, returning the number of rows written
pub fn export_records(records: &[&BillingRecord], path: &Path) -> Result<usize> {
    let csv_err = |source| DelinquencyError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for record in records {
        writer.serialize(ExportRow::from(*record)).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AccountState;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let record = BillingRecord::new("9", date, 12.5)
            .with_state(AccountState::Closed)
            .with_type("Ambulatório");

        let written = export_records(&[&record], &path).unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("cd_paciente,dt_atendimento,ano,mes"));
        assert_eq!(
            lines.next().unwrap(),
            "9,15/03/2024,2024,2024-03,Ambulatório,S,,,12.5,,,"
        );
    }
}
