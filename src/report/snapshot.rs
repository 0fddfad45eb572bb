//! A serializable view of the registry, for dumping diagnostics to JSON
//! instead of (or alongside) the terminal report. Opaque `TypeId`s are
//! resolved to display names at snapshot time, so the output stands on its
//! own.

use std::path::Path;
use std::{fmt, fs::File, io};

use serde::Serialize;

use crate::track::key::{AllocationKey, DataLocation, ErrorKind, ErrorRecord};
use crate::track::registry::AllocationRegistry;
use crate::track::typenames;

#[non_exhaustive]
#[derive(Debug)]
pub enum SnapshotError {
    IoError(io::Error),
    SerdeJsonError(serde_json::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::IoError(err) => write!(f, "io error: {err}"),
            SnapshotError::SerdeJsonError(err) => write!(f, "serde_json error: {err}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::IoError(err) => Some(err),
            SnapshotError::SerdeJsonError(err) => Some(err),
        }
    }
}

/// One allocation as the outside world sees it: address, resolved type name,
/// and both recorded sites
#[derive(Debug, Serialize)]
pub struct AllocationView {
    pub address: usize,
    pub type_name: String,
    pub allocated_at: Option<DataLocation>,
    pub deleted_at: Option<DataLocation>,
}

impl AllocationView {
    fn of(key: &AllocationKey) -> Self {
        Self {
            address: key.address,
            type_name: typenames::resolve(key.type_id).unwrap_or_else(|| "?".to_owned()),
            allocated_at: key.allocation_point.clone(),
            deleted_at: key.deletion_point.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub at: DataLocation,
    pub type_name: String,
    pub subject: AllocationView,
}

impl ErrorView {
    fn of(record: &ErrorRecord) -> Self {
        Self {
            kind: record.kind,
            at: record.error_location.clone(),
            type_name: typenames::resolve(record.type_id_at_error)
                .unwrap_or_else(|| "?".to_owned()),
            subject: AllocationView::of(&record.subject),
        }
    }
}

/// A full, self-contained copy of the registry's state at one instant
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub live: Vec<AllocationView>,
    pub deleted: Vec<AllocationView>,
    pub errors: Vec<ErrorView>,
}

impl Snapshot {
    pub fn of(registry: &AllocationRegistry) -> Self {
        let mut live: Vec<_> = registry.live().values().map(AllocationView::of).collect();
        live.sort_by_key(|view| view.address);
        Self {
            live,
            deleted: registry.deleted().iter().map(AllocationView::of).collect(),
            errors: registry.errors().iter().map(ErrorView::of).collect(),
        }
    }

    pub fn write_json<W: io::Write>(&self, writer: W) -> Result<(), SnapshotError> {
        serde_json::to_writer_pretty(writer, self).map_err(SnapshotError::SerdeJsonError)
    }

    pub fn write_json_file(&self, path: &Path) -> Result<(), SnapshotError> {
        let file = File::create(path).map_err(SnapshotError::IoError)?;
        self.write_json(file)
    }
}
