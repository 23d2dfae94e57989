//! Health Records
//!
//! The input side of the engine:
//!
//! - **types**: Record model (Category, DailyRecord, RecordSet)
//! - **loader**: Contract validation plus JSON / CSV loading
//! - **align**: Master date index and aligned metric series
//! - **error**: Contract-violation and loading errors
//!
//! # Data Flow
//!
//! ```text
//! JSON / CSV → RecordSet (validated) → AlignedData → analyses
//! ```

pub mod align;
pub mod error;
pub mod loader;
pub mod types;

pub use align::{humanize, is_clock_field, parse_clock_time, AlignedData, MetricSeries};
pub use error::{RecordError, RecordResult};
pub use loader::{load_csv_dir, load_csv_file, load_json, load_path};
pub use types::{Category, DailyRecord, FieldValue, RecordSet};
