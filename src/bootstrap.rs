//! The bootstrap record ("shim data", data model §3) and the per-thread
//! slot it's published into. Grounded on `migrate.c`'s `struct shim_data`
//! and `pthread_migrate_args()`; the original parks a pointer in a slot
//! the pthread runtime reserves, which maps directly onto Rust's native
//! `thread_local!` (SPEC_FULL §10) — no crate needed, each OS thread
//! already owns independent storage for it.

use crate::registers::RegisterSet;
use std::cell::Cell;
use std::os::raw::c_void;

/// Data needed to resume user code after a migration. `regset` points at
/// storage that must outlive the `MIGRATE` syscall — in practice the
/// destination register set living in the shim's own stack-allocated
/// activation frame (Design Note "Stack-allocated cross-ISA handoff"),
/// which is logically the same stack the destination resumes on.
pub struct ShimData {
    pub callback: Option<unsafe extern "C" fn(*mut c_void)>,
    pub callback_data: *mut c_void,
    pub regset: *mut RegisterSet,
    /// Reserved for the trampoline's convenience, unused by the shim
    /// itself (data model §3).
    pub post_syscall: *mut c_void,
}

thread_local! {
    /// The well-known per-thread bootstrap slot (§6 "Per-thread bootstrap
    /// slot"). Strictly thread-local: no other thread may observe or
    /// mutate it (§5).
    static SLOT: Cell<*mut ShimData> = Cell::new(std::ptr::null_mut());
}

/// Publish a bootstrap record into the current thread's slot (PUBLISH,
/// §4.5). The pointer must remain valid until `take()` is called on
/// whichever ISA resumes execution.
///
/// # Safety
/// `data` must point at storage that outlives the subsequent `MIGRATE`
/// syscall and any resumption on the destination.
pub unsafe fn publish(data: *mut ShimData) {
    SLOT.with(|cell| cell.set(data));
}

/// Non-null iff this invocation of the shim is a post-migration
/// resumption (ENTRY, §4.5): "the same function address serves as both
/// pre- and post-migration landing... distinguished solely by whether the
/// per-thread bootstrap slot is null" (Design Note "Double-entry control
/// flow").
pub fn peek() -> *mut ShimData {
    SLOT.with(|cell| cell.get())
}

/// Clear the slot to null. Called on every exit path (§5 "Resource
/// discipline"): validation failure, rewrite failure, transfer failure,
/// and normal CALLBACK completion. Leaving a non-null slot would cause the
/// next call into the shim on this thread to be misinterpreted as a
/// post-migration resumption.
pub fn clear() {
    SLOT.with(|cell| cell.set(std::ptr::null_mut()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_starts_null_and_clears_to_null() {
        assert!(peek().is_null());
        let mut data = ShimData {
            callback: None,
            callback_data: std::ptr::null_mut(),
            regset: std::ptr::null_mut(),
            post_syscall: std::ptr::null_mut(),
        };
        unsafe { publish(&mut data as *mut ShimData) };
        assert!(!peek().is_null());
        clear();
        assert!(peek().is_null());
    }
}
