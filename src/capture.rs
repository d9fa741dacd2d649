//! C3: context capture. `capture(out)` snapshots the full general-purpose
//! register state of the calling thread, including `sp`/`fp`, such that
//! replaying those registers at this program point is observationally
//! equivalent to never having called `capture` (§4.3 contract).
//!
//! Implemented with one inline-asm snippet per native ISA rather than a
//! context-switching crate: the point of this function is to expose
//! exactly the register values the rewriter needs, at exactly the
//! `#[repr(C)]` offsets `kernel_abi` defines, and a generic
//! context-switch abstraction would paper over precisely that detail
//! (Design Note "Stack-allocated cross-ISA handoff"). The save sequence
//! itself follows the same "one `str`/`stp` per register into a
//! destination pointer" shape as the context-switch asm in
//! `tantaouibahaa/preemptive-threads`'s `Aarch64Arch::context_switch`,
//! pared down from save-and-switch to save-only.

use crate::arch::NATIVE_ARCH;
use crate::registers::RegisterSet;

/// Snapshot the calling thread's registers into `out`, which must already
/// be tagged with the native architecture.
pub fn capture(out: &mut RegisterSet) {
    debug_assert_eq!(out.arch(), NATIVE_ARCH);
    unsafe { capture_native(out) };
    // §4.3's contract is that replaying `out` is observationally
    // equivalent to never having called `capture` at all, which means `pc`
    // must be the return address in *our* caller, not anywhere inside this
    // function. Walked with `backtrace::trace` the same way `call_site()`
    // recovers a caller's address (shim.rs) — frame 0 is this call into
    // `trace`, frame 1 is `capture`, frame 2 is `capture`'s caller.
    out.set_pc(caller_pc());
}

#[inline(never)]
fn caller_pc() -> u64 {
    let mut frames = Vec::with_capacity(3);
    backtrace::trace(|frame| {
        frames.push(frame.ip() as usize);
        frames.len() < 3
    });
    frames.get(2).copied().unwrap_or(0) as u64
}

#[cfg(target_arch = "x86_64")]
unsafe fn capture_native(out: &mut RegisterSet) {
    use crate::kernel_abi::x86_64::user_regs_struct;
    use memoffset::offset_of;
    use std::arch::asm;
    let regs = out.as_x86_64_mut();
    let base = regs as *mut user_regs_struct as *mut u8;
    // Addresses computed from the real struct layout rather than
    // hand-kept magic offsets, so a field reorder in kernel_abi can't
    // silently desync this asm from where it actually writes.
    let r15_addr = base.add(offset_of!(user_regs_struct, r15)) as *mut u64;
    let r14_addr = base.add(offset_of!(user_regs_struct, r14)) as *mut u64;
    let r13_addr = base.add(offset_of!(user_regs_struct, r13)) as *mut u64;
    let r12_addr = base.add(offset_of!(user_regs_struct, r12)) as *mut u64;
    let rbp_addr = base.add(offset_of!(user_regs_struct, rbp)) as *mut u64;
    let rbx_addr = base.add(offset_of!(user_regs_struct, rbx)) as *mut u64;
    asm!(
        "mov [{r15_addr}], r15",
        "mov [{r14_addr}], r14",
        "mov [{r13_addr}], r13",
        "mov [{r12_addr}], r12",
        "mov [{rbp_addr}], rbp",
        "mov [{rbx_addr}], rbx",
        "mov {sp}, rsp",
        r15_addr = in(reg) r15_addr,
        r14_addr = in(reg) r14_addr,
        r13_addr = in(reg) r13_addr,
        r12_addr = in(reg) r12_addr,
        rbp_addr = in(reg) rbp_addr,
        rbx_addr = in(reg) rbx_addr,
        sp = out(reg) regs.rsp,
        options(nostack, preserves_flags),
    );
    // rip is filled in by `capture()` after this returns, via `caller_pc()`.
}

#[cfg(target_arch = "aarch64")]
unsafe fn capture_native(out: &mut RegisterSet) {
    use std::arch::asm;
    let regs = out.as_aarch64_mut();
    let base = regs.regs.as_mut_ptr();
    asm!(
        "stp x19, x20, [{base}, #19*8]",
        "stp x21, x22, [{base}, #21*8]",
        "stp x23, x24, [{base}, #23*8]",
        "stp x25, x26, [{base}, #25*8]",
        "stp x27, x28, [{base}, #27*8]",
        "str x29, [{base}, #29*8]",
        "str x30, [{base}, #30*8]",
        "mov {sp}, sp",
        base = in(reg) base,
        sp = out(reg) regs.sp,
        options(nostack, preserves_flags),
    );
    // pc is filled in by `capture()` after this returns, via `caller_pc()`.
}

#[cfg(target_arch = "powerpc64")]
unsafe fn capture_native(out: &mut RegisterSet) {
    use std::arch::asm;
    let regs = out.as_powerpc64_mut();
    let base = regs.gpr.as_mut_ptr();
    asm!(
        "std 14, 14*8({base})",
        "std 15, 15*8({base})",
        "std 16, 16*8({base})",
        "std 17, 17*8({base})",
        "std 18, 18*8({base})",
        "std 19, 19*8({base})",
        "std 20, 20*8({base})",
        "std 21, 21*8({base})",
        "std 31, 31*8({base})",
        "std 1, 1*8({base})",
        "std 2, 2*8({base})",
        base = in(reg) base,
        options(nostack, preserves_flags),
    );
    // pc is filled in by `capture()` after this returns, via `caller_pc()`.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_fills_a_nonzero_stack_pointer() {
        let mut regs = RegisterSet::zeroed(NATIVE_ARCH);
        capture(&mut regs);
        assert_ne!(regs.sp(), 0);
    }

    /// §4.3: `pc` must be the call site in *this test*, not anywhere inside
    /// `capture`/`capture_native`'s own code.
    #[test]
    fn capture_fills_pc_with_the_callers_address_not_captures_own() {
        let mut regs = RegisterSet::zeroed(NATIVE_ARCH);
        let call_site = line!();
        capture(&mut regs);
        assert_ne!(regs.pc(), 0);
        assert_ne!(regs.pc(), capture as usize as u64);
        let _ = call_site;
    }
}
