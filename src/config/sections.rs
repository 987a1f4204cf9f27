use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub data: DataSettings,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub auth: Option<AuthSettings>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DataSettings {
    pub dir: String,
    #[serde(default = "default_totals_file")]
    pub totals_file: String,
    #[serde(default = "default_annotations_dir")]
    pub annotations_dir: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportSettings {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_extra_charge_tag")]
    pub extra_charge_tag: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            extra_charge_tag: default_extra_charge_tag(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplaySettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: char,
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            thousands_separator: default_thousands_separator(),
            decimal_separator: default_decimal_separator(),
        }
    }
}

/// Role-check API consulted once per invocation
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthSettings {
    /// Base URL; the user name is appended as the last path segment
    pub url: String,
    /// Where users are sent when the API answers 403
    pub portal_url: String,
    #[serde(default = "default_role")]
    pub role: i64,
    #[serde(default = "default_system")]
    pub system: i64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_totals_file() -> String {
    "totais_mensais.csv".to_string()
}

fn default_annotations_dir() -> String {
    "data/annotations".to_string()
}

fn default_encoding() -> String {
    "latin1".to_string()
}

fn default_top_n() -> usize {
    15
}

fn default_extra_charge_tag() -> String {
    "CONTA EXTRA".to_string()
}

fn default_currency_symbol() -> String {
    "R$".to_string()
}

fn default_thousands_separator() -> char {
    '.'
}

fn default_decimal_separator() -> char {
    ','
}

fn default_role() -> i64 {
    24
}

fn default_system() -> i64 {
    10
}

fn default_timeout_secs() -> u64 {
    5
}
