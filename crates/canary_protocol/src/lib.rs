//! Data Canary wire types
//!
//! Everything that crosses a process boundary lives here:
//!
//! - [`types`]: the closed physical type vocabulary ([`DataType`]), column
//!   roles and AI logical types
//! - [`snapshot`]: the Profiling Snapshot produced by the profiler
//! - [`suggestion`]: the AI Suggestion Report and the human Override map
//! - [`defaults`] / [`paths`]: canonical defaults and on-disk locations

pub mod defaults;
pub mod paths;
pub mod snapshot;
pub mod suggestion;
pub mod types;

pub use snapshot::{ColumnStat, ProfilingSnapshot, Quantiles, TopValue};
pub use suggestion::{Override, OverrideMap, Suggestion, SuggestionReport};
pub use types::{ColumnRole, DataType, LogicalType, TypeFamily, UnsupportedTypeError};
