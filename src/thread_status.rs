//! Kernel-owned, read-only thread status (data model §3): `{current_nid,
//! proposed_nid, peer_nid, peer_pid}`, fetched on demand via
//! `GET_THREAD_STATUS`. The core never caches `current_nid` across
//! suspension points — every caller re-queries the kernel.

use crate::log::LogLevel::LogWarn;
use crate::sys;

#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadStatus {
    pub current_nid: i32,
    pub proposed_nid: i32,
    pub peer_nid: i32,
    pub peer_pid: i32,
}

/// Fetch the current thread's migration status. On syscall failure,
/// returns `None` — callers (§7 "Thread-status query failure") treat that
/// as "no migration needed" when it flows into a `current_nid()` caller.
pub fn get_thread_status() -> Option<ThreadStatus> {
    match sys::get_thread_status() {
        Ok(raw) => Some(ThreadStatus {
            current_nid: raw.current_nid,
            proposed_nid: raw.proposed_nid,
            peer_nid: raw.peer_nid,
            peer_pid: raw.peer_pid,
        }),
        Err(()) => {
            crate::log!(
                LogWarn,
                "GET_THREAD_STATUS syscall failed: {}",
                sys::last_os_error()
            );
            None
        }
    }
}

/// `current_nid()` (§4.2): `-1` when the kernel query fails.
pub fn current_nid() -> i32 {
    get_thread_status().map(|s| s.current_nid).unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::test_doubles::{set_thread_status_result, RawThreadStatus};

    #[test]
    fn current_nid_is_minus_one_on_syscall_failure() {
        set_thread_status_result(None);
        assert_eq!(current_nid(), -1);
    }

    #[test]
    fn current_nid_reflects_kernel_report() {
        set_thread_status_result(Some(RawThreadStatus {
            current_nid: 3,
            proposed_nid: -1,
            peer_nid: -1,
            peer_pid: -1,
        }));
        assert_eq!(current_nid(), 3);
    }
}
