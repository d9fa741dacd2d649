//! `RegisterSet`: the tagged union over the three supported ISAs' register
//! files (data model §3). Generalizes `isgasho-rd/src/registers.rs`'s
//! `Registers` (a union over x86/x64) from two architectures to three, and
//! keeps the same shape: a `SupportedArch` tag plus a `#[repr(C)]` union of
//! the raw per-ISA payloads, with accessors that switch on the tag once
//! instead of making every caller do it.

use crate::arch::SupportedArch;
use crate::kernel_abi::{aarch64, powerpc64, x86_64};
use bitflags::bitflags;

bitflags! {
    /// x86-64 EFLAGS bits relevant to diagnostics. Mirrors the loose
    /// `X86_*_FLAG` constants `isgasho-rd/src/registers.rs` defines, as a
    /// bitflags type instead of bare consts.
    pub struct X86Flags: u64 {
        const RESERVED = 1 << 1;
        const TF = 1 << 8;
        const IF = 1 << 9;
        const DF = 1 << 10;
        const RF = 1 << 16;
        const ID = 1 << 21;
    }
}

bitflags! {
    /// AArch64 PSTATE condition flags (N, Z, C, V) plus the EL0t default.
    pub struct PstateFlags: u64 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
    }
}

/// The bare union of per-ISA register payloads, with no arch tag and no
/// other field ahead of it — this is the layout the external rewriter
/// engine's `rewrite_stack` (§4.4, §6) actually reads and writes, so it
/// must be passed across that FFI boundary on its own (`RegisterSet::raw_ptr`/
/// `raw_mut_ptr` below), never the tagged `RegisterSet` wrapper.
#[repr(C)]
#[derive(Copy, Clone)]
pub(crate) union RegisterUnion {
    aarch64: aarch64::user_regs_struct,
    powerpc64: powerpc64::user_regs_struct,
    x86_64: x86_64::user_regs_struct,
}

/// A register file tagged with the architecture it is shaped for.
/// Invariant (data model §3): the tag matches whatever architecture the
/// union is consumed as, whether that's the source of a `capture()` or the
/// destination `rewrite()` produced.
#[derive(Copy, Clone)]
pub struct RegisterSet {
    arch: SupportedArch,
    u: RegisterUnion,
}

impl RegisterSet {
    pub fn zeroed(arch: SupportedArch) -> RegisterSet {
        let u = match arch {
            SupportedArch::Aarch64 => RegisterUnion {
                aarch64: aarch64::user_regs_struct::default(),
            },
            SupportedArch::Powerpc64 => RegisterUnion {
                powerpc64: powerpc64::user_regs_struct::default(),
            },
            SupportedArch::X86_64 => RegisterUnion {
                x86_64: x86_64::user_regs_struct::default(),
            },
        };
        RegisterSet { arch, u }
    }

    pub fn arch(&self) -> SupportedArch {
        self.arch
    }

    /// Raw pointer to the bare per-ISA union, with the `arch` tag and any
    /// other wrapper field stripped away — this, not `&self`, is what must
    /// cross the FFI boundary into the external rewriter engine (§4.4),
    /// since `rewrite_stack`'s actual argument type has no tag field ahead
    /// of the union it reads and writes.
    pub(crate) fn raw_ptr(&self) -> *const RegisterUnion {
        &self.u
    }

    pub(crate) fn raw_mut_ptr(&mut self) -> *mut RegisterUnion {
        &mut self.u
    }

    pub fn as_aarch64(&self) -> &aarch64::user_regs_struct {
        debug_assert_eq!(self.arch, SupportedArch::Aarch64);
        unsafe { &self.u.aarch64 }
    }

    pub fn as_aarch64_mut(&mut self) -> &mut aarch64::user_regs_struct {
        debug_assert_eq!(self.arch, SupportedArch::Aarch64);
        unsafe { &mut self.u.aarch64 }
    }

    pub fn as_powerpc64(&self) -> &powerpc64::user_regs_struct {
        debug_assert_eq!(self.arch, SupportedArch::Powerpc64);
        unsafe { &self.u.powerpc64 }
    }

    pub fn as_powerpc64_mut(&mut self) -> &mut powerpc64::user_regs_struct {
        debug_assert_eq!(self.arch, SupportedArch::Powerpc64);
        unsafe { &mut self.u.powerpc64 }
    }

    pub fn as_x86_64(&self) -> &x86_64::user_regs_struct {
        debug_assert_eq!(self.arch, SupportedArch::X86_64);
        unsafe { &self.u.x86_64 }
    }

    pub fn as_x86_64_mut(&mut self) -> &mut x86_64::user_regs_struct {
        debug_assert_eq!(self.arch, SupportedArch::X86_64);
        unsafe { &mut self.u.x86_64 }
    }

    /// Stack pointer, in whatever ISA-specific slot it lives (§4.4 item 2).
    pub fn sp(&self) -> u64 {
        match self.arch {
            SupportedArch::Aarch64 => unsafe { self.u.aarch64.sp },
            SupportedArch::Powerpc64 => unsafe { self.u.powerpc64.gpr[powerpc64::SP_INDEX] },
            SupportedArch::X86_64 => unsafe { self.u.x86_64.rsp },
        }
    }

    /// Frame pointer, in whatever ISA-specific slot it lives (§4.4 item 2):
    /// `x29` for AArch64, `r31` for POWERPC64, `rbp` for x86-64.
    pub fn fp(&self) -> u64 {
        match self.arch {
            SupportedArch::Aarch64 => unsafe { self.u.aarch64.regs[aarch64::FP_INDEX] },
            SupportedArch::Powerpc64 => unsafe { self.u.powerpc64.gpr[powerpc64::FP_INDEX] },
            SupportedArch::X86_64 => unsafe { self.u.x86_64.rbp },
        }
    }

    pub fn pc(&self) -> u64 {
        match self.arch {
            SupportedArch::Aarch64 => unsafe { self.u.aarch64.pc },
            SupportedArch::Powerpc64 => unsafe { self.u.powerpc64.pc },
            SupportedArch::X86_64 => unsafe { self.u.x86_64.rip },
        }
    }

    /// Overwrite the instruction-pointer field with the resumption
    /// trampoline's address (§4.4 item 1).
    pub fn set_pc(&mut self, value: u64) {
        match self.arch {
            SupportedArch::Aarch64 => unsafe { self.u.aarch64.pc = value },
            SupportedArch::Powerpc64 => unsafe { self.u.powerpc64.pc = value },
            SupportedArch::X86_64 => unsafe { self.u.x86_64.rip = value },
        }
    }
}
