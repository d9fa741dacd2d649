//! Raw per-ISA register layouts.
//!
//! These mirror the shape of a kernel `user_regs_struct` the way
//! `isgasho-rd`'s `kernel_abi::{x86, x64}` modules do for their two
//! supported architectures, generalized here to the three this crate
//! supports. Each struct is `#[repr(C)]` and laid out field-for-field in
//! the order the destination ISA's ABI expects, because the external
//! stack-transform engine (out of scope, §4.4) reads and writes these
//! structs directly.

pub mod aarch64;
pub mod powerpc64;
pub mod x86_64;
