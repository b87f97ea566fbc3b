//! Query-history record model and normalization.
//!
//! Raw warehouse rows (dialect-specific field maps) are canonicalized into
//! [`QueryRecord`]s before any analysis runs. Normalization is a pure
//! function of its input; malformed rows are reported, never fatal.

mod normalizer;
mod record;

pub use normalizer::{normalize_row, NormalizeError};
pub use record::{QueryRecord, RawQueryRow, TableReference};
