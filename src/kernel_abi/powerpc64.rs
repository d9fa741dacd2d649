#![allow(non_camel_case_types)]

use static_assertions::const_assert_eq;

/// POWERPC64 (ELFv2 ABI) general-purpose register file: `r0`..`r31`, plus
/// the special-purpose registers the ABI mandates be restored explicitly
/// (`pc`, link register, condition register, the TOC pointer `r2`, and
/// `xer`/`ctr`). `r1` is the stack pointer, `r31` the conventional frame
/// pointer — both by C ABI convention, not hardware requirement, matching
/// §4.4's note that `sp`/`fp` extraction is ISA-specific.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct user_regs_struct {
    /// r0..r31.
    pub gpr: [u64; 32],
    pub pc: u64,
    pub msr: u64,
    pub orig_gpr3: u64,
    pub ctr: u64,
    pub link: u64,
    pub xer: u64,
    pub ccr: u64,
    /// Table-of-contents pointer; an ABI invariant a trampoline must
    /// re-establish on entry (§4.7) because it isn't part of the logical
    /// call-stack state the rewriter reasons about.
    pub softe: u64,
    pub trap: u64,
}

/// Index of the stack-pointer register (r1) within `gpr`.
pub const SP_INDEX: usize = 1;
/// Index of the frame-pointer register (r31) within `gpr`.
pub const FP_INDEX: usize = 31;
/// Index of the TOC pointer (r2) within `gpr`.
pub const TOC_INDEX: usize = 2;

const_assert_eq!(std::mem::size_of::<user_regs_struct>(), 40 * 8);
