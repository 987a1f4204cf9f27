use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DelinquencyError {
    #[error("Config directory not found at {0}. Run 'delinquency init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Unknown text encoding '{0}'")]
    UnknownEncoding(String),

    #[error("No detail CSV found in {0}. Place the billing extract there and try again.")]
    DetailFileNotFound(PathBuf),

    #[error("Column '{column}' is missing from {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Text in {path} cannot be represented as {encoding}")]
    Unencodable { path: PathBuf, encoding: String },

    #[error("No records found for the selected filters")]
    NoRecords,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Patient '{patient}' is not listed in the {variant} table")]
    PatientNotRanked { patient: String, variant: String },

    #[error("Nothing to change. Use --cause and/or --status.")]
    NothingToAnnotate,

    #[error("Missing credentials. Use --user/--token or set DELINQUENCY_USER/DELINQUENCY_TOKEN.")]
    MissingCredentials,

    #[error("Access denied. Sign in again at {portal}")]
    AccessDenied { portal: String },

    #[error("User '{0}' does not have the reporting role")]
    RoleMissing(String),

    #[error("Authentication request failed: {0}")]
    AuthRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DelinquencyError>;
