//! Raw kernel syscalls this crate consumes (§6 "Kernel syscalls
//! consumed"). Plays the same "boundary between our code and the raw
//! kernel ABI" role `isgasho-rd`'s `bindings` module does, just without a
//! bindgen-generated binding (the three opcodes are deployment-specified
//! numbers, not something a header exposes).
//!
//! Every function here is substituted by a `#[cfg(test)]` double so the
//! higher-level modules (`topology`, `thread_status`, `shim`) can be
//! exercised without a real Popcorn kernel underneath, the same "swap the
//! real syscall for a test double behind a thin wrapper" seam the teacher
//! keeps at its own syscall/ptrace edges.

use crate::arch::Arch;
use libc::{c_int, c_long};

pub const MAX_NODES: usize = 32;

/// Deployment-specified syscall numbers. These placeholder values follow
/// the convention of being far outside the range any mainline Linux
/// syscall table currently assigns, the same way out-of-tree syscall
/// additions are typically numbered during development.
#[cfg(not(test))]
mod nr {
    pub const GET_NODE_INFO: i64 = 436;
    pub const GET_THREAD_STATUS: i64 = 437;
    pub const MIGRATE: i64 = 438;
}

/// One row of the kernel-reported node table, as it comes off the wire —
/// i.e. before `topology::NodeInfo` turns the raw arch integer into an
/// `Arch`.
#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct RawNodeInfo {
    pub available: c_int,
    pub arch: c_int,
    pub distance: c_int,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct RawThreadStatus {
    pub current_nid: c_int,
    pub proposed_nid: c_int,
    pub peer_nid: c_int,
    pub peer_pid: c_int,
}

/// `GET_NODE_INFO(origin_nid_out, node_array_out[MAX_NODES])`.
/// Returns `Ok(origin_nid)` on success.
#[cfg(not(test))]
pub fn get_node_info() -> Result<(i32, [RawNodeInfo; MAX_NODES]), ()> {
    let mut origin_nid: c_int = -1;
    let mut nodes = [RawNodeInfo::default(); MAX_NODES];
    let ret: c_long = unsafe {
        libc::syscall(
            nr::GET_NODE_INFO,
            &mut origin_nid as *mut c_int,
            nodes.as_mut_ptr(),
        )
    };
    if ret == 0 {
        Ok((origin_nid, nodes))
    } else {
        Err(())
    }
}

/// `GET_THREAD_STATUS(status_out)`.
#[cfg(not(test))]
pub fn get_thread_status() -> Result<RawThreadStatus, ()> {
    let mut status = RawThreadStatus::default();
    let ret: c_long = unsafe {
        libc::syscall(nr::GET_THREAD_STATUS, &mut status as *mut RawThreadStatus)
    };
    if ret == 0 {
        Ok(status)
    } else {
        Err(())
    }
}

/// `MIGRATE`. Has the dual homogeneous/heterogeneous semantics described in
/// §4.5: on a heterogeneous migration this call does not return on the
/// source ISA at all (the process resumes at the destination's trampoline
/// address instead); on a homogeneous migration it returns in place with
/// `Ok(())`/`Err(())` indicating whether the kernel accepted the transfer.
#[cfg(not(test))]
pub fn migrate() -> Result<(), ()> {
    let ret: c_long = unsafe { libc::syscall(nr::MIGRATE) };
    if ret == 0 {
        Ok(())
    } else {
        Err(())
    }
}

#[cfg(test)]
pub use test_doubles::*;

#[cfg(test)]
pub mod test_doubles {
    use super::{RawNodeInfo, RawThreadStatus, MAX_NODES};
    use std::cell::RefCell;

    thread_local! {
        static NODE_INFO_RESULT: RefCell<Option<(i32, [RawNodeInfo; MAX_NODES])>> =
            RefCell::new(None);
        static THREAD_STATUS_RESULT: RefCell<Option<RawThreadStatus>> = RefCell::new(None);
        static MIGRATE_RESULT: RefCell<Result<(), ()>> = RefCell::new(Ok(()));
    }

    pub fn set_node_info_result(v: Option<(i32, [RawNodeInfo; MAX_NODES])>) {
        NODE_INFO_RESULT.with(|cell| *cell.borrow_mut() = v);
    }

    pub fn set_thread_status_result(v: Option<RawThreadStatus>) {
        THREAD_STATUS_RESULT.with(|cell| *cell.borrow_mut() = v);
    }

    pub fn set_migrate_result(v: Result<(), ()>) {
        MIGRATE_RESULT.with(|cell| *cell.borrow_mut() = v);
    }

    pub fn get_node_info() -> Result<(i32, [RawNodeInfo; MAX_NODES]), ()> {
        NODE_INFO_RESULT.with(|cell| (*cell.borrow()).ok_or(()))
    }

    pub fn get_thread_status() -> Result<RawThreadStatus, ()> {
        THREAD_STATUS_RESULT.with(|cell| (*cell.borrow()).ok_or(()))
    }

    pub fn migrate() -> Result<(), ()> {
        MIGRATE_RESULT.with(|cell| *cell.borrow())
    }
}

/// Decode a raw arch integer into `Arch`; kept here (rather than folded
/// into `topology`) because it's purely a property of how `sys` encodes
/// the wire format.
pub fn decode_arch(raw: c_int) -> Arch {
    Arch::from_raw(raw)
}

/// `errno` as left by the most recent failed syscall in this module, for
/// callers that want a `perror`-style string in their diagnostic (§7's
/// policy is "diagnostic, return", not any particular wording).
#[cfg(not(test))]
pub fn last_os_error() -> nix::errno::Errno {
    nix::errno::Errno::last()
}

#[cfg(test)]
pub fn last_os_error() -> nix::errno::Errno {
    nix::errno::Errno::UnknownErrno
}
