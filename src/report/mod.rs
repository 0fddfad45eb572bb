//! Reporting: the terminal renderer, a serde snapshot, and the explicit
//! teardown points that replace destructor-timed reporting.

pub mod ansi;
pub mod render;
pub mod snapshot;

pub use render::{print_errors, print_nonfreed, render_errors, render_nonfreed};
pub use snapshot::{Snapshot, SnapshotError};

/// Report leaks, then accumulated errors, from the process-wide registry to
/// stdout. This is the explicit shutdown point; call it once the tracked
/// phase of the program is over. No-op with tracking disabled.
pub fn finalize() {
    #[cfg(feature = "track")]
    {
        print_nonfreed();
        print_errors();
    }
}

/// Runs [`finalize`] when dropped, so a scope (usually `main`) can guarantee
/// a report without threading an explicit call through every exit path
#[must_use]
pub struct ReportGuard {
    _priv: (),
}

/// The scoped-guard flavour of [`finalize`]
pub fn report_on_drop() -> ReportGuard {
    ReportGuard { _priv: () }
}

impl Drop for ReportGuard {
    fn drop(&mut self) {
        finalize();
    }
}
