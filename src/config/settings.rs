use encoding_rs::Encoding;
use std::path::{Path, PathBuf};

use super::{resolve_path, Config};
use crate::error::{DelinquencyError, Result};

/// Runtime paths and knobs handed to the loader, the annotation store and the
/// report builders. Built from `config.toml`, or directly in tests.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub totals_file: String,
    pub annotations_dir: PathBuf,
    pub encoding: &'static Encoding,
    pub top_n: usize,
    pub extra_charge_tag: String,
}

impl Settings {
    /// Defaults rooted at `data_dir`: annotations live in `data_dir/annotations`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            annotations_dir: data_dir.join("annotations"),
            data_dir,
            totals_file: "totais_mensais.csv".to_string(),
            encoding: encoding_rs::WINDOWS_1252,
            top_n: 15,
            extra_charge_tag: "CONTA EXTRA".to_string(),
        }
    }

    pub fn from_config(config: &Config, cfg_dir: &Path) -> Result<Self> {
        Ok(Self {
            data_dir: resolve_path(&config.data.dir, cfg_dir),
            totals_file: config.data.totals_file.clone(),
            annotations_dir: resolve_path(&config.data.annotations_dir, cfg_dir),
            encoding: lookup_encoding(&config.data.encoding)?,
            top_n: config.report.top_n,
            extra_charge_tag: config.report.extra_charge_tag.clone(),
        })
    }

    pub fn totals_path(&self) -> PathBuf {
        self.data_dir.join(&self.totals_file)
    }
}

/// Resolve a WHATWG encoding label ("latin1", "utf-8", ...)
pub fn lookup_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| DelinquencyError::UnknownEncoding(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_label_maps_to_windows_1252() {
        assert_eq!(lookup_encoding("latin1").unwrap(), encoding_rs::WINDOWS_1252);
        assert_eq!(lookup_encoding(" UTF-8 ").unwrap(), encoding_rs::UTF_8);
    }

    #[test]
    fn unknown_label_is_rejected() {
        assert!(matches!(
            lookup_encoding("klingon"),
            Err(DelinquencyError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let config: Config = toml::from_str(
            r#"
            [data]
            dir = "data"
            annotations_dir = "/srv/notes"
            "#,
        )
        .unwrap();

        let settings = Settings::from_config(&config, Path::new("/etc/delinquency")).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/etc/delinquency/data"));
        assert_eq!(settings.annotations_dir, PathBuf::from("/srv/notes"));
        assert_eq!(settings.top_n, 15);
        assert_eq!(settings.totals_path(), PathBuf::from("/etc/delinquency/data/totais_mensais.csv"));
    }
}
