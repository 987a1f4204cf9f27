pub mod annotation;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod format;
pub mod report;

pub use annotation::{merge_annotations, AnnotatedRow, Annotation, AnnotationStore, JoinKey};
pub use config::{Config, Settings};
pub use data::{AccountState, BillingRecord, Dataset, Loader, MonthlyTotal};
pub use error::{DelinquencyError, Result};
pub use report::{Dashboard, Filter, RankedRow, ReportContext, ReportVariant};
