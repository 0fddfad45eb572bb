//! The record types the registry is made of: call sites, allocation
//! provenance, and the errors detected against them.

use std::any::TypeId;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A call site in the tracked program
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataLocation {
    pub line: u32,
    pub file: PathBuf,
}

impl DataLocation {
    pub fn new(line: u32, file: impl Into<PathBuf>) -> Self {
        Self {
            line,
            file: file.into(),
        }
    }

    /// The shortened `parent-dir/file-name` form used in reports, so paths
    /// stay readable without losing which module the file sits in
    pub fn short_path(&self) -> PathBuf {
        let name = match self.file.file_name() {
            Some(name) => Path::new(name),
            None => self.file.as_path(),
        };
        match self.file.parent().and_then(Path::file_name) {
            Some(dir) => Path::new(dir).join(name),
            None => name.to_path_buf(),
        }
    }
}

/// One tracked allocation's full provenance. `deletion_point` is stamped the
/// first time a deletion reaches the entry, whether or not it was accepted.
#[derive(Clone, Debug)]
pub struct AllocationKey {
    pub address: usize,
    pub type_id: TypeId,
    pub allocation_point: Option<DataLocation>,
    pub deletion_point: Option<DataLocation>,
}

impl AllocationKey {
    pub fn new(address: usize, type_id: TypeId, allocation_point: DataLocation) -> Self {
        Self {
            address,
            type_id,
            allocation_point: Some(allocation_point),
            deletion_point: None,
        }
    }

    /// A degenerate key standing in for memory the registry never saw; only
    /// the static type of the attempted deletion is known
    pub fn untracked(type_id: TypeId) -> Self {
        Self {
            address: 0,
            type_id,
            allocation_point: None,
            deletion_point: None,
        }
    }
}

/// What went wrong with a tracked allocation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An address was tracked again without an intervening deletion
    PreviouslyTracked,
    /// A second deletion of an address already recorded as deleted
    PreviouslyDeleted,
    /// A deletion through a static type other than the one tracked
    TypePun,
    /// A deletion of an address the registry never saw
    Untracked,
}

/// An anomaly caught by the registry, immutable once recorded. `subject` is
/// an owned copy of the ledger entry as it looked at detection time -- later
/// overwrites of the ledger must not rewrite history.
#[derive(Clone, Debug)]
pub struct ErrorRecord {
    pub subject: AllocationKey,
    pub error_location: DataLocation,
    pub type_id_at_error: TypeId,
    pub kind: ErrorKind,
}

impl ErrorRecord {
    pub fn new(subject: AllocationKey, error_location: DataLocation, kind: ErrorKind) -> Self {
        let type_id_at_error = subject.type_id;
        Self {
            subject,
            error_location,
            type_id_at_error,
            kind,
        }
    }

    /// Like [`ErrorRecord::new`], but the type observed at the error site
    /// differs from the subject's (the type-punned delete case)
    pub fn with_type(
        subject: AllocationKey,
        error_location: DataLocation,
        kind: ErrorKind,
        type_id_at_error: TypeId,
    ) -> Self {
        Self {
            subject,
            error_location,
            type_id_at_error,
            kind,
        }
    }
}
