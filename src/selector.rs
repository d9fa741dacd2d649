//! C2: the migration-point selector. `decide(return_address)` implements
//! whichever of the env-range or signal-trigger strategies (§4.1) is
//! active at build time, chosen by exactly one of the `strategy-*` Cargo
//! features — the same "exactly one active, chosen at build time"
//! discipline `isgasho-rd`'s own `verify_syscall_numbers` feature applies
//! to an alternate code path. The third strategy named in §4.1, scheduled
//! mapping, is explicitly "not used by `decide`"; it is `schedule::lookup`,
//! always compiled in and consulted directly by `migrate_schedule` (§4.6)
//! regardless of which of these two is active.

use crate::log::LogLevel::LogWarn;

/// The three hardcoded env-range destinations from `migrate.c`'s
/// `do_migrate`, preserved for bug-compatibility (SPEC_FULL §10, spec.md
/// §9 Open Question, choice (a)): each names a node of a *different* ISA
/// than the one it's compiled for, so the env-range strategy always
/// forces a heterogeneous transform.
pub const ENV_RANGE_DEST_AARCH64: i32 = 0;
pub const ENV_RANGE_DEST_POWERPC64: i32 = 1;
pub const ENV_RANGE_DEST_X86_64: i32 = 2;

#[cfg(feature = "strategy-env-range")]
mod env_range {
    use super::*;
    use std::cell::Cell;
    use std::env;

    struct Range {
        start: u64,
        end: u64,
    }

    thread_local! {
        static ALREADY_MIGRATED: Cell<bool> = Cell::new(false);
    }

    fn parse_range(start_var: &str, end_var: &str) -> Option<Range> {
        let start = env::var(start_var).ok()?;
        let end = env::var(end_var).ok()?;
        let start = u64::from_str_radix(start.trim(), 16).ok()?;
        let end = u64::from_str_radix(end.trim(), 16).ok()?;
        // Malformed (start > end) disables the strategy for this ISA
        // (§6 "Missing or malformed values disable the strategy").
        if start > end {
            crate::log!(
                LogWarn,
                "migration range {}..{} has start > end, disabling env-range strategy",
                start_var,
                end_var
            );
            return None;
        }
        Some(Range { start, end })
    }

    #[cfg(target_arch = "aarch64")]
    fn local_range() -> Option<Range> {
        parse_range("AARCH64_MIGRATE_START", "AARCH64_MIGRATE_END")
    }
    #[cfg(target_arch = "powerpc64")]
    fn local_range() -> Option<Range> {
        parse_range("POWERPC64_MIGRATE_START", "POWERPC64_MIGRATE_END")
    }
    #[cfg(target_arch = "x86_64")]
    fn local_range() -> Option<Range> {
        parse_range("X86_64_MIGRATE_START", "X86_64_MIGRATE_END")
    }

    #[cfg(target_arch = "aarch64")]
    const DEST: i32 = ENV_RANGE_DEST_AARCH64;
    #[cfg(target_arch = "powerpc64")]
    const DEST: i32 = ENV_RANGE_DEST_POWERPC64;
    #[cfg(target_arch = "x86_64")]
    const DEST: i32 = ENV_RANGE_DEST_X86_64;

    /// §4.1 "Environment range". `return_address == 0` behaves as
    /// "outside any range" (§4.1 edge cases). Once this thread has
    /// migrated once, `decide` returns `NONE` forever after regardless of
    /// return address (§3 invariant, §8 "decide returns a node at most
    /// once per thread").
    pub fn decide(return_address: usize) -> Option<i32> {
        if return_address == 0 {
            return None;
        }
        if ALREADY_MIGRATED.with(Cell::get) {
            return None;
        }
        let range = local_range()?;
        let addr = return_address as u64;
        if range.start <= addr && addr < range.end {
            ALREADY_MIGRATED.with(|c| c.set(true));
            Some(DEST)
        } else {
            None
        }
    }
}

#[cfg(feature = "strategy-signal")]
mod signal {
    use crate::thread_status::get_thread_status;

    /// §4.1 "Signal trigger": `proposed_nid` from the kernel, or `NONE` if
    /// the kernel hasn't set a trigger (modeled here as `proposed_nid <
    /// 0`, mirroring `current_nid()`'s own "-1 means no answer"
    /// convention).
    pub fn decide(_return_address: usize) -> Option<i32> {
        let status = get_thread_status()?;
        if status.proposed_nid >= 0 {
            Some(status.proposed_nid)
        } else {
            None
        }
    }

    /// Clear the per-thread trigger once PUBLISH has consumed it (§4.5
    /// PUBLISH: "If the signal-trigger strategy is in use, also clear the
    /// per-thread trigger flag"). The trigger itself lives in the kernel;
    /// clearing it is a syscall out of this crate's scope, so this is a
    /// no-op placeholder for the call site the shim invokes.
    pub fn clear_trigger() {}
}

/// `decide(return_address) -> node_id | NONE` (§4.1). Exactly one of the
/// two `decide()` strategies (env-range, signal) is compiled in; the
/// scheduled mapping is never one of them (§4.1: "Not used by `decide`") —
/// it is reached only via `crate::schedule::lookup`, called directly by
/// `migrate_schedule` regardless of which strategy is active here.
pub fn decide(return_address: usize) -> Option<i32> {
    #[cfg(feature = "strategy-env-range")]
    return env_range::decide(return_address);
    #[cfg(feature = "strategy-signal")]
    return signal::decide(return_address);
}

/// Called from PUBLISH when the signal-trigger strategy is active; a
/// no-op under the env-range strategy.
pub fn clear_trigger() {
    #[cfg(feature = "strategy-signal")]
    signal::clear_trigger();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "strategy-env-range")]
    #[test]
    fn null_return_address_is_outside_any_range() {
        assert_eq!(decide(0), None);
    }

    #[cfg(feature = "strategy-env-range")]
    mod env_range_tests {
        use super::*;
        use lazy_static::lazy_static;
        use std::env;
        use std::sync::Mutex;

        #[cfg(target_arch = "aarch64")]
        const START_VAR: &str = "AARCH64_MIGRATE_START";
        #[cfg(target_arch = "aarch64")]
        const END_VAR: &str = "AARCH64_MIGRATE_END";
        #[cfg(target_arch = "aarch64")]
        const EXPECTED_DEST: i32 = ENV_RANGE_DEST_AARCH64;

        #[cfg(target_arch = "powerpc64")]
        const START_VAR: &str = "POWERPC64_MIGRATE_START";
        #[cfg(target_arch = "powerpc64")]
        const END_VAR: &str = "POWERPC64_MIGRATE_END";
        #[cfg(target_arch = "powerpc64")]
        const EXPECTED_DEST: i32 = ENV_RANGE_DEST_POWERPC64;

        #[cfg(target_arch = "x86_64")]
        const START_VAR: &str = "X86_64_MIGRATE_START";
        #[cfg(target_arch = "x86_64")]
        const END_VAR: &str = "X86_64_MIGRATE_END";
        #[cfg(target_arch = "x86_64")]
        const EXPECTED_DEST: i32 = ENV_RANGE_DEST_X86_64;

        lazy_static! {
            // `std::env::set_var` mutates whole-process state; serialize the
            // tests in this module so they don't stomp on each other's
            // START/END pair when `cargo test` runs them concurrently.
            static ref ENV_LOCK: Mutex<()> = Mutex::new(());
        }

        /// §8 invariant "`decide` returns a node at most once per thread",
        /// §8 scenario 4: a thread that calls `check_migrate` twice from the
        /// same in-range return address only migrates on the first call.
        /// Run on a freshly spawned thread so `ALREADY_MIGRATED`'s
        /// thread-local state starts clean regardless of test order.
        #[test]
        fn fires_once_then_none_for_the_same_thread() {
            let _guard = ENV_LOCK.lock().unwrap();
            env::set_var(START_VAR, "400500");
            env::set_var(END_VAR, "400600");

            std::thread::spawn(|| {
                assert_eq!(decide(0x400550), Some(EXPECTED_DEST));
                assert_eq!(decide(0x400550), None);
            })
            .join()
            .unwrap();

            env::remove_var(START_VAR);
            env::remove_var(END_VAR);
        }

        /// SPEC_FULL §4.1 / §7 "malformed env values": `start > end` is
        /// rejected rather than silently accepted with a reversed range.
        #[test]
        fn start_after_end_disables_the_strategy() {
            let _guard = ENV_LOCK.lock().unwrap();
            env::set_var(START_VAR, "400600");
            env::set_var(END_VAR, "400500");

            std::thread::spawn(|| {
                assert_eq!(decide(0x400550), None);
            })
            .join()
            .unwrap();

            env::remove_var(START_VAR);
            env::remove_var(END_VAR);
        }
    }
}
