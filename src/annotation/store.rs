use encoding_rs::Encoding;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::Annotation;
use crate::config::Settings;
use crate::data::normalize_code;
use crate::error::{DelinquencyError, Result};
use crate::report::ReportVariant;

/// One CSV of case notes per report variant, read and rewritten whole
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    dir: PathBuf,
    encoding: &'static Encoding,
}

impl AnnotationStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            dir: settings.annotations_dir.clone(),
            encoding: settings.encoding,
        }
    }

    pub fn path(&self, variant: ReportVariant) -> PathBuf {
        self.dir.join(variant.file_name())
    }

    /// Stored notes for `variant`. A missing file gives no notes; so does an
    /// unreadable one, after a warning.
    pub fn load(&self, variant: ReportVariant) -> Vec<Annotation> {
        let path = self.path(variant);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no annotation file");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read annotation file");
                return Vec::new();
            }
        };

        let (text, _, _) = self.encoding.decode(&bytes);
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let parsed: std::result::Result<Vec<Annotation>, csv::Error> = reader.deserialize().collect();

        match parsed {
            Ok(annotations) => annotations
                .into_iter()
                .map(|mut a| {
                    a.patient_id = normalize_code(&a.patient_id);
                    a
                })
                .collect(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed annotation file");
                Vec::new()
            }
        }
    }

    /// Replace the stored notes for `variant`
    pub fn save(&self, variant: ReportVariant, annotations: &[Annotation]) -> Result<PathBuf> {
        let path = self.path(variant);
        fs::create_dir_all(&self.dir)?;

        let csv_err = |source| DelinquencyError::Csv {
            path: path.clone(),
            source,
        };
        let mut writer = csv::Writer::from_writer(Vec::new());
        for annotation in annotations {
            writer.serialize(annotation).map_err(csv_err)?;
        }
        let text = writer
            .into_inner()
            .map_err(|e| DelinquencyError::Io(e.into_error()))?;
        let text = String::from_utf8_lossy(&text);

        let (bytes, _, unmappable) = self.encoding.encode(&text);
        if unmappable {
            return Err(DelinquencyError::Unencodable {
                path,
                encoding: self.encoding.name().to_string(),
            });
        }
        fs::write(&path, bytes)?;

        info!(variant = %variant, rows = annotations.len(), path = %path.display(), "saved annotations");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> AnnotationStore {
        AnnotationStore::new(&Settings::new(dir.path()))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load(ReportVariant::RecentClosed).is_empty());
    }

    #[test]
    fn save_then_load_is_exact() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let notes = vec![
            Annotation::new("p1")
                .with_month("05/2024")
                .with_cause("Glosa, convênio")
                .with_status("em cobrança"),
            Annotation::new("p2").with_month("04/2024"),
        ];

        let path = store.save(ReportVariant::AgedOpen, &notes).unwrap();
        assert!(path.ends_with("top_15_inadimplentes_mais_de_12_meses_ca.csv"));
        assert_eq!(store.load(ReportVariant::AgedOpen), notes);

        // written as latin-1
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.contains(&0xE7));
    }

    #[test]
    fn header_matches_column_contract() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let path = store
            .save(ReportVariant::RecentClosed, &[Annotation::new("1").with_cause("x")])
            .unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("cd_paciente,dt_atendimento,causa,status_atual\n"));
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(dir.path().join("annotations")).unwrap();
        fs::write(
            store.path(ReportVariant::RecentOpen),
            "causa,status_atual\nonly,a note\n",
        )
        .unwrap();

        assert!(store.load(ReportVariant::RecentOpen).is_empty());
    }

    #[test]
    fn patient_ids_are_normalized_on_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(dir.path().join("annotations")).unwrap();
        fs::write(
            store.path(ReportVariant::RecentClosed),
            "cd_paciente,causa,status_atual\n 42.0 ,disputed,\n",
        )
        .unwrap();

        let notes = store.load(ReportVariant::RecentClosed);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].patient_id, "42");
        assert_eq!(notes[0].attendance_month, None);
        assert_eq!(notes[0].cause, "disputed");
    }

    #[test]
    fn unencodable_text_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let err = store
            .save(ReportVariant::RecentClosed, &[Annotation::new("1").with_cause("日本")])
            .unwrap_err();
        assert!(matches!(err, DelinquencyError::Unencodable { .. }));
    }
}
