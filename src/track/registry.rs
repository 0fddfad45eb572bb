//! The allocation ledger itself.
//!
//! Three pieces of state, all owned here: `live` (one entry per currently
//! tracked address), `deleted` (append-only history of accepted deletions),
//! and `errors` (every anomaly, in detection order). Nothing in this module
//! is fatal -- a misuse becomes an [`ErrorRecord`] and the run continues;
//! whether anyone ever looks at the record is the renderer's business.
//!
//! The process-wide instance lives behind a single mutex reached through
//! [`with`]. Operations are short, non-reentrant mutations, so one lock is
//! both the simplest and a perfectly adequate design.

use std::any::TypeId;
use std::mem;
use std::sync::{Mutex, PoisonError};

use hashbrown::HashMap;
use log::{debug, trace};
use once_cell::sync::Lazy;

use super::key::{AllocationKey, DataLocation, ErrorKind, ErrorRecord};

/// The ledger of live and deleted tracked allocations, plus every misuse
/// detected against them
#[derive(Default)]
pub struct AllocationRegistry {
    live: HashMap<usize, AllocationKey>,
    deleted: Vec<AllocationKey>,
    errors: Vec<ErrorRecord>,
}

impl AllocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `address` as a fresh allocation of `type_id` made at `at`.
    ///
    /// Tracking an address that is already live is itself a bug worth
    /// reporting: the old entry's provenance is preserved in a
    /// [`ErrorKind::PreviouslyTracked`] record, then the ledger entry is
    /// overwritten unconditionally.
    pub fn record_allocation(&mut self, address: usize, type_id: TypeId, at: DataLocation) {
        trace!(
            "record_allocation({address:#x}) at {}:{}",
            at.file.display(),
            at.line
        );
        if let Some(existing) = self.live.get(&address) {
            debug!("address {address:#x} is already tracked, logging the overwrite");
            self.errors.push(ErrorRecord::new(
                existing.clone(),
                at.clone(),
                ErrorKind::PreviouslyTracked,
            ));
        }
        self.live
            .insert(address, AllocationKey::new(address, type_id, at));
    }

    /// Record a deletion of `address` through static type `type_id`.
    ///
    /// Returns whether the deletion was accepted. `false` means the caller
    /// must not assume the memory was released through this path: either the
    /// address was not live at all, or the delete was type-punned. A punned
    /// entry keeps its place in `live` -- we do not trust a delete through
    /// the wrong type to have released anything, so the entry will surface
    /// again as an apparent leak.
    pub fn record_deletion(&mut self, address: usize, type_id: TypeId, at: DataLocation) -> bool {
        trace!(
            "record_deletion({address:#x}) at {}:{}",
            at.file.display(),
            at.line
        );
        match self.live.get_mut(&address) {
            None => false,
            Some(entry) => {
                entry.deletion_point = Some(at.clone());
                if entry.type_id != type_id {
                    debug!("type-punned delete of {address:#x}");
                    let subject = entry.clone();
                    self.errors.push(ErrorRecord::with_type(
                        subject,
                        at,
                        ErrorKind::TypePun,
                        type_id,
                    ));
                    false
                } else {
                    if let Some(entry) = self.live.remove(&address) {
                        self.deleted.push(entry);
                    }
                    true
                }
            }
        }
    }

    /// The gate to put in front of the real deallocation. Returns whether
    /// the caller should proceed with it.
    ///
    /// A live address delegates to [`record_deletion`]. Anything else is an
    /// error: a match in the deletion history is a double delete, no match
    /// means the memory was never tracked (or tracked under another type).
    /// Both refuse the real deallocation -- leaking the second delete's
    /// target is a diagnosable outcome, a double free is a crash.
    ///
    /// [`record_deletion`]: AllocationRegistry::record_deletion
    pub fn safe_deletion(&mut self, address: usize, type_id: TypeId, at: DataLocation) -> bool {
        if self.live.contains_key(&address) {
            return self.record_deletion(address, type_id, at);
        }
        match self.find_deleted(address, type_id).cloned() {
            Some(initial) => {
                debug!("double delete of {address:#x}");
                self.errors
                    .push(ErrorRecord::new(initial, at, ErrorKind::PreviouslyDeleted));
            }
            None => {
                debug!("delete of untracked address {address:#x}");
                self.errors.push(ErrorRecord::new(
                    AllocationKey::untracked(type_id),
                    at,
                    ErrorKind::Untracked,
                ));
            }
        }
        false
    }

    /// The earliest historical deletion matching both `address` and
    /// `type_id`; this is the entry double-free diagnostics point back at
    pub fn find_deleted(&self, address: usize, type_id: TypeId) -> Option<&AllocationKey> {
        self.deleted
            .iter()
            .find(|key| key.address == address && key.type_id == type_id)
    }

    pub fn live(&self) -> &HashMap<usize, AllocationKey> {
        &self.live
    }

    pub fn deleted(&self) -> &[AllocationKey] {
        &self.deleted
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Back to pristine
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Checkpoint: keep what is still live, forget the deletion history and
    /// the error log. Used to segment diagnostics across independent test
    /// phases while still catching leaks that cross the boundary.
    pub fn pass(&mut self) {
        let live = mem::take(&mut self.live);
        *self = Self {
            live,
            ..Self::default()
        };
    }
}

static REGISTRY: Lazy<Mutex<AllocationRegistry>> = Lazy::new(Mutex::default);

/// Run `f` with exclusive access to the process-wide registry. This is the
/// single access point; the registry is created lazily on first use and
/// lives for the process.
pub fn with<R>(f: impl FnOnce(&mut AllocationRegistry) -> R) -> R {
    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut registry)
}
