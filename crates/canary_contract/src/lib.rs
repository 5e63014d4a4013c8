//! Contract Engine
//!
//! # Lifecycle: Snapshot + Suggestions + Overrides, then Contract
//!
//! 1. **Resolve**: every column gets a name, type and role, taken from the
//!    reviewer if set, else the AI review, else the profiler
//! 2. **Build**: resolved columns plus the snapshot become a Draft, with the
//!    snapshot frozen as the statistical baseline
//! 3. **Validate**: the Draft is checked against every invariant; all
//!    violations are reported together
//! 4. **Approve**: a human signs off and the registry records the version
//! 5. **Watch**: each new batch is profiled and compared with the baseline;
//!    error-level drift blocks the append until someone accepts it
//!
//! Approved contracts never change. Evolving a table means approving the
//! next version, which supersedes the previous one.
//!
//! # Modules
//!
//! - [`contract`]: contract, resolved column and baseline types
//! - [`resolver`]: precedence fold (User > AI > Original)
//! - [`builder`]: Draft assembly
//! - [`validator`]: invariant checks
//! - [`drift`]: health reports and the append gate
//! - [`approval`]: draft workflow, approval and versioning
//! - [`storage`]: SQLite-backed contract registry

pub mod approval;
pub mod builder;
pub mod config;
pub mod contract;
pub mod drift;
pub mod error;
pub mod resolver;
pub mod storage;
pub mod validator;

pub use approval::{approve, next_version, prepare_contract, DraftRequest};
pub use builder::build_contract;
pub use config::{DriftConfig, DriftConfigError};
pub use contract::*;
pub use drift::{
    detect_drift, gate_append, AppendBlocked, AppendDecision, ColumnDrift, ColumnHealth,
    DriftAcceptance, HealthReport, Severity, ValueSummary,
};
pub use error::{
    ConcurrentModificationError, ContractError, IncompleteInputError, InvalidStateError,
    StaleOverrideError, ValidationFailure, Violation, ViolationKind,
};
pub use resolver::resolve_columns;
pub use storage::{ContractStorage, StorageError};
pub use validator::{check_contract, is_valid_target_name, validate_contract};
