//! The call-site capture layer: thin `#[track_caller]` wrappers that grab
//! `(address, static type, file, line)` at each tracked allocation or
//! deletion and forward it into the registry. All the actual bookkeeping
//! lives in [`registry`]; this module just captures and forwards.
//!
//! With the `track` feature disabled every function here degrades to a
//! pass-through over the underlying allocate/drop primitives: no recording,
//! no diagnostics, no registry.

pub mod key;
pub mod registry;
pub mod typenames;

#[cfg(feature = "track")]
use std::panic::Location;

#[cfg(feature = "track")]
use self::key::DataLocation;

#[cfg(feature = "track")]
fn here(location: &'static Location<'static>) -> DataLocation {
    DataLocation::new(location.line(), location.file())
}

/// Track `ptr` as a fresh allocation of `T` made at the caller's location,
/// handing the pointer back so the call can wrap an allocation in place
#[track_caller]
pub fn register_allocation<T: 'static>(ptr: *mut T) -> *mut T {
    #[cfg(feature = "track")]
    {
        let at = here(Location::caller());
        let type_id = typenames::intern::<T>();
        registry::with(|reg| reg.record_allocation(ptr as usize, type_id, at));
    }
    ptr
}

/// Record a deletion of `ptr` through type `T` at the caller's location.
/// Returns whether the registry accepted it; the memory itself is untouched.
#[track_caller]
pub fn register_deletion<T: 'static>(ptr: *mut T) -> bool {
    #[cfg(feature = "track")]
    {
        let at = here(Location::caller());
        let type_id = typenames::intern::<T>();
        return registry::with(|reg| reg.record_deletion(ptr as usize, type_id, at));
    }
    #[cfg(not(feature = "track"))]
    {
        let _ = ptr;
        true
    }
}

/// Box `value` and track the fresh allocation in one step
#[track_caller]
pub fn alloc_tracked<T: 'static>(value: T) -> *mut T {
    register_allocation(Box::into_raw(Box::new(value)))
}

/// Delete `ptr` through the registry's double-free gate. The real
/// deallocation only happens if the registry clears it; a refused delete
/// leaks the pointee on purpose and the report will say why.
///
/// # Safety
///
/// - `ptr` must have come from [`Box::into_raw`] (e.g. via
///   [`alloc_tracked`]) and must not be used after this call. It *may*
///   already have been released through this gate -- that is exactly the
///   double free this function exists to intercept, and the pointee is never
///   touched when the registry refuses.
#[track_caller]
pub unsafe fn safe_delete<T: 'static>(ptr: *mut T) {
    #[cfg(feature = "track")]
    {
        let at = here(Location::caller());
        let type_id = typenames::intern::<T>();
        let proceed = registry::with(|reg| reg.safe_deletion(ptr as usize, type_id, at));
        if proceed {
            // SAFETY: the registry confirmed this exact (address, type) pair
            // is live and has now retired it, so this is the one and only
            // release of the box.
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
    #[cfg(not(feature = "track"))]
    // SAFETY: caller asserts ownership; with tracking off there is no gate.
    drop(unsafe { Box::from_raw(ptr) });
}

/// Erase the process-wide registry back to pristine state
pub fn reset() {
    #[cfg(feature = "track")]
    registry::with(|reg| reg.reset());
}

/// Checkpoint the process-wide registry: start fresh, carrying forward only
/// the currently live entries
pub fn pass() {
    #[cfg(feature = "track")]
    registry::with(|reg| reg.pass());
}
