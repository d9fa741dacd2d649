#![allow(non_camel_case_types)]

use static_assertions::const_assert_eq;

/// AArch64 general-purpose register file, laid out the way the kernel's
/// `struct user_regs_struct` for arm64 is: `x0`..`x30`, `sp`, `pc`, `pstate`.
/// Field order and size matter — the external rewriter (§4.4) is the only
/// other party that touches this memory, and it expects exactly this
/// layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct user_regs_struct {
    /// x0..x30 (x30 is the link register).
    pub regs: [u64; 31],
    pub sp: u64,
    pub pc: u64,
    pub pstate: u64,
}

/// Index of the frame-pointer register (x29) within `regs`.
pub const FP_INDEX: usize = 29;
/// Index of the link register (x30) within `regs`.
pub const LR_INDEX: usize = 30;

const_assert_eq!(std::mem::size_of::<user_regs_struct>(), 34 * 8);
