//! Deliberately misuses the tracker so the full report shows up: one leak of
//! every flavour, plus all four error kinds. Run from the crate root so the
//! renderer can find this file and quote it.

use alloctrace::{alloc_tracked, register_allocation, safe_delete};

fn main() {
    env_logger::init();
    let _report = alloctrace::report_on_drop();

    // never deleted: shows up in the unfreed list
    let _leaked = alloc_tracked(vec![1u8, 2, 3]);

    // tracked twice without an intervening delete
    let p = alloc_tracked(7u32);
    register_allocation(p);

    // deleted through the wrong type: refused, stays live
    let q = alloc_tracked(0.5f64);
    unsafe { safe_delete(q as *mut u32) };

    // deleted twice: the second one is caught before it can crash
    let r = alloc_tracked(String::from("gone"));
    unsafe { safe_delete(r) };
    unsafe { safe_delete(r) };

    // never tracked at all
    let s = Box::into_raw(Box::new(1i64));
    unsafe { safe_delete(s) };
    // the gate refused, so reclaim it by hand
    drop(unsafe { Box::from_raw(s) });
}
