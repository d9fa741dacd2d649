//! C6: per-ISA resumption trampolines (§4.7). Each is reached with a
//! freshly loaded register file and a stack already consistent with the
//! destination ABI; its job is to re-establish whatever ABI invariant
//! can't be expressed inside the register set itself (frame-pointer
//! chaining, the POWERPC64 TOC pointer) and then transfer control into
//! the shim's re-entry point so CALLBACK runs.
//!
//! The rewriter built the destination stack frame to look like a fresh
//! call into the shim (Design Note "Double-entry control flow"), so the
//! trampoline must reach it with a plain jump, never a `call` — a `call`
//! would push a return address the rewritten frame has no slot for.
//! `#[naked]` functions give exactly that: no prologue, no implicit stack
//! traffic before the jump. Named `__migrate_fixup_{arch}` after
//! `migrate.c`'s own trampoline symbols, which REWRITE (§4.4 item 1)
//! patches into the destination `pc`.
//!
//! The two non-native trampolines are declared but not defined here: in a
//! real deployment they're supplied by the per-ISA sibling build of this
//! same crate, linked at consistent addresses by the (out of scope, §1)
//! cross-ISA build tooling — the original's C sources likewise compile to
//! three separate per-ISA binaries sharing symbol layout. The
//! naked-function jump shape follows `jamesbornholt/generator-rs`'s
//! `#[naked] unsafe extern "C" fn trampoline_1`.

#![allow(clippy::missing_safety_doc)]

use crate::arch::SupportedArch;
use std::arch::asm;

extern "C" {
    #[cfg(not(target_arch = "aarch64"))]
    fn __migrate_fixup_aarch64();
    #[cfg(not(target_arch = "powerpc64"))]
    fn __migrate_fixup_powerpc64();
    #[cfg(not(target_arch = "x86_64"))]
    fn __migrate_fixup_x86_64();
}

/// The trampoline address to patch into a destination register set's
/// `pc` field (§4.4 item 1), for whichever arch that destination is.
pub fn address_for(arch: SupportedArch) -> u64 {
    unsafe {
        match arch {
            SupportedArch::Aarch64 => __migrate_fixup_aarch64 as usize as u64,
            SupportedArch::Powerpc64 => __migrate_fixup_powerpc64 as usize as u64,
            SupportedArch::X86_64 => __migrate_fixup_x86_64 as usize as u64,
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[naked]
#[no_mangle]
pub unsafe extern "C" fn __migrate_fixup_x86_64() {
    // rbp/rsp/arguments already loaded per the rewritten register set;
    // the x86-64 SysV ABI needs no further fixup. Jumping straight to the
    // shim's own entry point is equivalent to the CPU having just
    // executed `call migrate_shim_internal` against the rewritten frame.
    asm!("jmp {entry}", entry = sym crate::shim::migrate_shim_internal, options(noreturn));
}

#[cfg(target_arch = "aarch64")]
#[naked]
#[no_mangle]
pub unsafe extern "C" fn __migrate_fixup_aarch64() {
    // x29/x30 (frame pointer / link register) come pre-loaded in the
    // rewritten register set; nothing else to chain before re-entry.
    asm!("b {entry}", entry = sym crate::shim::migrate_shim_internal, options(noreturn));
}

#[cfg(target_arch = "powerpc64")]
#[naked]
#[no_mangle]
pub unsafe extern "C" fn __migrate_fixup_powerpc64() {
    // ELFv2 requires r2 (TOC pointer) be (re)established from the global
    // entry point before any further calls; the rewriter's register set
    // doesn't encode a TOC base on its own.
    asm!(
        "0:",
        "addis 2, 12, .TOC.-0b@ha",
        "addi 2, 2, .TOC.-0b@l",
        "b {entry}",
        entry = sym crate::shim::migrate_shim_internal,
        options(noreturn),
    );
}
