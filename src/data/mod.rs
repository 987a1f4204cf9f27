mod export;
mod loader;
mod parse;
mod record;

pub use export::export_records;
pub use loader::{Columns, Dataset, Loader, CLOSED_FLAG, COMPANY, OUTSTANDING, RECORD_TYPE};
pub use parse::{normalize_code, parse_day_first, parse_decimal, parse_month};
pub use record::{month_key, AccountState, BillingRecord, MonthlyTotal};
