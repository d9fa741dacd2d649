//! C5: the migration shim. The only component with non-trivial control
//! flow (§4.5) — everything else in this crate exists to give this state
//! machine something to call. Grounded line-by-line on `migrate.c`'s
//! `__migrate_shim_internal`, `check_migrate`, `migrate` and
//! `migrate_schedule`.

use crate::arch::SupportedArch;
use crate::bootstrap::{self, ShimData};
use crate::log::LogLevel::{LogError, LogWarn};
use crate::registers::RegisterSet;
use crate::rewrite;
use crate::selector;
use crate::sys;
use crate::thread_status::current_nid;
use crate::topology::{node_available, node_arch};
use std::os::raw::c_void;

/// Spin post-migration until a debugger clears this flag (§4.5 "Debug
/// hold"), matching `migrate.c`'s `static volatile int __hold = 1;`
/// behind `#if _DEBUG == 1`.
#[cfg(feature = "debug-hold")]
pub static HOLD: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// The return address of `check_migrate`'s caller, the same role
/// `migrate.c`'s `get_call_site()` (`__builtin_return_address(0)` wrapped in
/// a `noinline` function) plays: the env-range selector (§4.1) matches this
/// address against a configured range, so it must be the address in *user*
/// code that invoked `check_migrate`, not an address inside this crate.
///
/// Stable Rust has no `__builtin_return_address`; `backtrace::trace` walks
/// the frame-pointer chain the same way, which is the dependency the
/// teacher already carries for exactly this kind of stack introspection.
/// Frame 0 is this function's own call into `trace`, frame 1 is
/// `check_migrate`, frame 2 is `check_migrate`'s caller.
#[inline(never)]
fn call_site() -> usize {
    let mut frames = Vec::with_capacity(3);
    backtrace::trace(|frame| {
        frames.push(frame.ip() as usize);
        frames.len() < 3
    });
    frames.get(2).copied().unwrap_or(0)
}

/// The core state machine (§4.5). `nid` is the destination node;
/// `callback`/`callback_data` are what runs after a successful migration,
/// or after a no-op re-entry on the destination.
///
/// This is also the function the resumption trampolines (C6) jump
/// directly into: the rewriter builds the destination stack frame to look
/// like a fresh call into this exact function (Design Note "Double-entry
/// control flow"), so its entry point doubles as the post-migration
/// landing pad. `extern "C"` pins down the calling convention the
/// trampolines' raw jumps rely on.
pub extern "C" fn migrate_shim_internal(
    nid: i32,
    callback: Option<unsafe extern "C" fn(*mut c_void)>,
    callback_data: *mut c_void,
) {
    // ENTRY: a non-null bootstrap slot means this is the destination side
    // of a prior migration — skip straight to CALLBACK.
    let existing = bootstrap::peek();
    if !existing.is_null() {
        run_callback(existing);
        return;
    }

    // VALIDATE
    if !node_available(nid) {
        crate::log!(LogWarn, "destination node {} is not available", nid);
        return;
    }

    // CAPTURE: register-set storage and the bootstrap record live in this
    // activation frame (§5 "Resource discipline") so both survive the
    // transfer — the stack rewriter operates on stack-allocated frames
    // only.
    let dst_arch = match node_arch(nid).supported() {
        Some(a) => a,
        None => {
            // §7 "Unsupported destination arch in C4": the topology
            // cache should never advertise an unsupported arch as
            // available; node_available() above already filters
            // Arch::Unknown out, so reaching here is a contract
            // violation elsewhere in the cache, not user input.
            panic!("node {} is available but has no supported arch", nid);
        }
    };

    let mut src_regs = RegisterSet::zeroed(crate::arch::NATIVE_ARCH);
    crate::capture::capture(&mut src_regs);

    // REWRITE
    let rewritten = match rewrite::rewrite(&src_regs, dst_arch) {
        Ok(r) => r,
        Err(_) => {
            crate::log!(LogWarn, "could not rewrite stack for node {}", nid);
            return;
        }
    };
    let mut dst_regs = rewritten.regs;

    // PUBLISH
    let mut data = ShimData {
        callback,
        callback_data,
        regset: &mut dst_regs as *mut RegisterSet,
        post_syscall: std::ptr::null_mut(),
    };
    unsafe { bootstrap::publish(&mut data as *mut ShimData) };
    selector::clear_trigger();

    // TRANSFER. Dual semantics (§4.5): heterogeneous migrations don't
    // return here at all (they resume at `dst_regs`'s patched pc, i.e.
    // back at the top of this function on the destination, where ENTRY
    // now finds a non-null bootstrap slot); homogeneous migrations return
    // in place with an error flag.
    match sys::migrate() {
        Ok(()) => {
            let data_ptr = bootstrap::peek();
            debug_assert!(!data_ptr.is_null());
            run_callback(data_ptr);
        }
        Err(()) => {
            crate::log!(
                LogError,
                "could not migrate to node {}: {}",
                nid,
                sys::last_os_error()
            );
            bootstrap::clear();
        }
    }
}

/// CALLBACK (§4.5): invoke the user callback if present, then clear the
/// bootstrap slot unconditionally (§5: the slot must be null on every
/// exit path) before returning to the caller of the shim.
fn run_callback(data_ptr: *mut ShimData) {
    #[cfg(feature = "debug-hold")]
    while HOLD.load(std::sync::atomic::Ordering::SeqCst) {
        std::hint::spin_loop();
    }

    let data = unsafe { &*data_ptr };
    if let Some(cb) = data.callback {
        unsafe { cb(data.callback_data) };
    }
    bootstrap::clear();
}

/// `check_migrate(callback, data)` (§4.6): consult the active selector
/// strategy with the caller's return address.
pub fn check_migrate(
    callback: Option<unsafe extern "C" fn(*mut c_void)>,
    callback_data: *mut c_void,
) {
    let nid = match selector::decide(call_site()) {
        Some(n) => n,
        None => return,
    };
    if nid != current_nid() {
        migrate_shim_internal(nid, callback, callback_data);
    }
}

/// `migrate(nid, callback, data)` (§4.6): migrate to a specific node
/// unless already there.
pub fn migrate(
    nid: i32,
    callback: Option<unsafe extern "C" fn(*mut c_void)>,
    callback_data: *mut c_void,
) {
    if nid != current_nid() {
        migrate_shim_internal(nid, callback, callback_data);
    }
}

/// `migrate_schedule(region, logical_tid, callback, data)` (§4.6):
/// consult the schedule table for `(region, logical_tid)`. Unlike the other
/// two entry points, this one does not depend on which `decide()` strategy
/// (§4.1) is compiled in — the scheduled mapping is a separate lookup,
/// always available.
pub fn migrate_schedule(
    region: usize,
    logical_tid: i32,
    callback: Option<unsafe extern "C" fn(*mut c_void)>,
    callback_data: *mut c_void,
) {
    let nid = crate::schedule::lookup(region, logical_tid);
    if nid != current_nid() {
        migrate_shim_internal(nid, callback, callback_data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Arch;
    use crate::sys::test_doubles::{set_migrate_result, set_thread_status_result, RawThreadStatus};
    use crate::sys::MAX_NODES;
    use crate::topology::test_override;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    thread_local! {
        static CALLBACK_RAN: Cell<bool> = Cell::new(false);
    }

    unsafe extern "C" fn mark_ran(_data: *mut c_void) {
        CALLBACK_RAN.with(|c| c.set(true));
    }

    fn topology_with(nid: i32, arch: Arch) {
        let mut nodes = [crate::topology::NodeInfo::default(); MAX_NODES];
        nodes[nid as usize] = crate::topology::NodeInfo {
            available: true,
            arch,
            distance: 0,
            raw_arch: arch as i32,
        };
        test_override::set(nodes);
    }

    #[test]
    fn migrate_to_current_node_is_a_noop() {
        set_thread_status_result(Some(RawThreadStatus {
            current_nid: 0,
            proposed_nid: -1,
            peer_nid: -1,
            peer_pid: -1,
        }));
        CALLBACK_RAN.with(|c| c.set(false));
        migrate(0, Some(mark_ran), std::ptr::null_mut());
        assert!(!CALLBACK_RAN.with(Cell::get));
    }

    #[test]
    fn unavailable_destination_does_not_invoke_callback() {
        topology_with(5, Arch::X86_64); // node 3 stays at its default (unavailable)
        set_thread_status_result(Some(RawThreadStatus {
            current_nid: 0,
            proposed_nid: -1,
            peer_nid: -1,
            peer_pid: -1,
        }));
        CALLBACK_RAN.with(|c| c.set(false));
        migrate(3, Some(mark_ran), std::ptr::null_mut());
        assert!(!CALLBACK_RAN.with(Cell::get));
        assert!(bootstrap::peek().is_null());
        test_override::clear();
    }

    #[test]
    fn homogeneous_migration_runs_callback_and_clears_slot() {
        use crate::arch::NATIVE_ARCH;
        topology_with(1, NATIVE_ARCH.as_arch());
        set_thread_status_result(Some(RawThreadStatus {
            current_nid: 0,
            proposed_nid: -1,
            peer_nid: -1,
            peer_pid: -1,
        }));
        set_migrate_result(Ok(()));
        crate::rewrite::test_double::set_should_succeed(true);

        CALLBACK_RAN.with(|c| c.set(false));
        migrate(1, Some(mark_ran), std::ptr::null_mut());
        assert!(CALLBACK_RAN.with(Cell::get));
        assert!(bootstrap::peek().is_null());
        test_override::clear();
    }

    #[test]
    fn migrate_primitive_failure_clears_slot_and_skips_callback() {
        use crate::arch::NATIVE_ARCH;
        topology_with(1, NATIVE_ARCH.as_arch());
        set_thread_status_result(Some(RawThreadStatus {
            current_nid: 0,
            proposed_nid: -1,
            peer_nid: -1,
            peer_pid: -1,
        }));
        set_migrate_result(Err(()));
        crate::rewrite::test_double::set_should_succeed(true);

        CALLBACK_RAN.with(|c| c.set(false));
        migrate(1, Some(mark_ran), std::ptr::null_mut());
        assert!(!CALLBACK_RAN.with(Cell::get));
        assert!(bootstrap::peek().is_null());
        test_override::clear();
        set_migrate_result(Ok(()));
    }

    #[test]
    fn rewrite_failure_leaves_slot_null_and_skips_callback() {
        use crate::arch::NATIVE_ARCH;
        topology_with(1, NATIVE_ARCH.as_arch());
        set_thread_status_result(Some(RawThreadStatus {
            current_nid: 0,
            proposed_nid: -1,
            peer_nid: -1,
            peer_pid: -1,
        }));
        crate::rewrite::test_double::set_should_succeed(false);

        CALLBACK_RAN.with(|c| c.set(false));
        migrate(1, Some(mark_ran), std::ptr::null_mut());
        assert!(!CALLBACK_RAN.with(Cell::get));
        assert!(bootstrap::peek().is_null());
        test_override::clear();
        crate::rewrite::test_double::set_should_succeed(true);
    }

    /// §8 scenario 6: sibling threads migrating independently don't share
    /// state. Each thread gets its own bootstrap slot and its own
    /// topology override, so this mostly tests that no global mutable
    /// state leaks across threads.
    #[test]
    fn concurrent_independent_migrations_each_run_once() {
        use crate::arch::NATIVE_ARCH;
        use rand::Rng;

        let ran_count = Arc::new(AtomicUsize::new(0));

        unsafe extern "C" fn bump(data: *mut c_void) {
            let counter = &*(data as *const AtomicUsize);
            counter.fetch_add(1, Ordering::SeqCst);
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let ran_count = Arc::clone(&ran_count);
            handles.push(std::thread::spawn(move || {
                // Jitter start order; each thread still must see exactly
                // one callback invocation of its own.
                let micros = rand::thread_rng().gen_range(0, 500);
                std::thread::sleep(std::time::Duration::from_micros(micros));

                set_thread_status_result(Some(RawThreadStatus {
                    current_nid: 0,
                    proposed_nid: -1,
                    peer_nid: -1,
                    peer_pid: -1,
                }));
                topology_with(1, NATIVE_ARCH.as_arch());
                set_migrate_result(Ok(()));
                crate::rewrite::test_double::set_should_succeed(true);

                let counter_ptr = Arc::as_ptr(&ran_count) as *mut c_void;
                migrate(1, Some(bump), counter_ptr);
                assert!(bootstrap::peek().is_null());
                test_override::clear();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ran_count.load(Ordering::SeqCst), 4);
    }
}
