pub mod comparator;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod report;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testutil;

pub use comparator::{FileComparator, FileRelation, SyncDecision};
pub use dependency::{DependencyReplicator, SiblingPattern, SiblingResult};
pub use engine::{RecordOutcome, SyncConfig, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use manifest::{ParsedManifest, SkippedRow, SyncRecord};
pub use report::{FailureScope, FileRole, SyncFailure, SyncOutcome, SyncReport, SyncReportBuilder};
pub use transfer::{CopyMode, FileTransfer, TransferSnapshot};
