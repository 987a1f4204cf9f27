mod sections;
mod settings;

pub use sections::{AuthSettings, Config, DataSettings, DisplaySettings, ReportSettings};
pub use settings::{lookup_encoding, Settings};

use crate::error::{DelinquencyError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.delinquency/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "delinquency") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.delinquency/
    let home = dirs_home().ok_or_else(|| {
        DelinquencyError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".delinquency"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Expand ~ and anchor relative paths at the config directory
pub fn resolve_path(path: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(path);
    if expanded.is_relative() {
        cfg_dir.join(expanded)
    } else {
        expanded
    }
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(DelinquencyError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| DelinquencyError::ConfigParse { path, source: e })
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[data]
# Folder the nightly extract job writes into. Relative paths are resolved
# against this config directory.
dir = "data"
totals_file = "totais_mensais.csv"   # monthly reference totals (optional file)
annotations_dir = "data/annotations" # case notes, one CSV per report variant
encoding = "latin1"

[report]
top_n = 15
extra_charge_tag = "CONTA EXTRA"

[display]
currency_symbol = "R$"
thousands_separator = "."
decimal_separator = ","

# Role check performed before any report is shown. Remove the section to
# run without authentication.
# [auth]
# url = "https://central.example.org:3001/api/menuPapel/usuario"
# portal_url = "https://central.example.org/"
# role = 24
# system = 10
"#;
