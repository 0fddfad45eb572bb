//! Debug-time allocation tracking with source-annotated diagnostics.
//!
//! Every tracked allocation and deletion is recorded with its call site and
//! static type. Deleting twice, deleting through the wrong type, deleting
//! something never tracked, or tracking the same address twice all become
//! diagnostics instead of crashes, and whatever is still live at teardown is
//! reported as a leak -- with the offending source lines quoted, compiler
//! style.
//!
//! ```no_run
//! let _report = alloctrace::report_on_drop();
//!
//! let p = alloctrace::alloc_tracked(41u32);
//! unsafe { alloctrace::safe_delete(p) };
//! unsafe { alloctrace::safe_delete(p) }; // caught, reported, not a crash
//! ```
//!
//! Build with `--no-default-features` to strip the instrumentation: every
//! entry point collapses to the underlying allocate/drop with no recording.

pub mod report;
pub mod source;
pub mod track;
pub mod util;

pub use report::{finalize, print_errors, print_nonfreed, report_on_drop, ReportGuard, Snapshot};
pub use track::{
    alloc_tracked, pass, register_allocation, register_deletion, reset, safe_delete,
};
