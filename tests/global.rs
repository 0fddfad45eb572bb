//! One end-to-end run against the process-wide registry. Everything that can
//! be tested on an owned `AllocationRegistry` lives next to the registry;
//! this file only covers what has to go through the global access point:
//! call-site capture, lifecycle ops, and rendering real source.
//!
//! Kept as a single test function on purpose -- the registry is process-wide
//! and the harness runs tests in parallel.

use alloctrace::report::{ansi, render_errors, render_nonfreed, Snapshot};
use alloctrace::track::registry;
use alloctrace::{alloc_tracked, pass, register_allocation, reset, safe_delete};

#[test]
fn global_lifecycle_tracks_and_reports() {
    ansi::set_colors_enabled(false);
    reset();

    let a = alloc_tracked(3u16);
    let b = alloc_tracked(String::from("still here"));
    register_allocation(b); // double tracking, recorded
    unsafe { safe_delete(a) };
    unsafe { safe_delete(a) }; // double delete, refused

    registry::with(|reg| {
        assert_eq!(reg.live().len(), 1);
        assert_eq!(reg.deleted().len(), 1);
        assert_eq!(reg.errors().len(), 2);
    });

    // captured locations point into this file
    let (errors, leaks) = registry::with(|reg| {
        let mut errors = Vec::new();
        render_errors(reg, &mut errors).unwrap();
        let mut leaks = Vec::new();
        render_nonfreed(reg, &mut leaks).unwrap();
        (
            String::from_utf8(errors).unwrap(),
            String::from_utf8(leaks).unwrap(),
        )
    });
    assert!(errors.contains("error: overwrote tracking of previously tracked variable"));
    assert!(errors.contains("error: double deletion found"));
    assert!(errors.contains("tests/global.rs"));
    // the quoted excerpt is this file's actual text
    assert!(errors.contains("unsafe { safe_delete(a) }; // double delete, refused"));
    assert!(leaks.contains("error: 1 unfreed pointer at:"));
    assert!(leaks.contains("tests/global.rs"));

    let snapshot = registry::with(|reg| Snapshot::of(reg));
    assert_eq!(snapshot.live.len(), 1);
    assert_eq!(snapshot.live[0].type_name, "String");

    // checkpoint: the leak crosses the boundary, history and errors do not
    pass();
    registry::with(|reg| {
        assert_eq!(reg.live().len(), 1);
        assert!(reg.deleted().is_empty());
        assert!(reg.errors().is_empty());
    });

    unsafe { safe_delete(b) };
    registry::with(|reg| assert!(reg.live().is_empty()));
    reset();
}
