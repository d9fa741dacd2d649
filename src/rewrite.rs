//! C4: the cross-ISA rewriter adapter. A thin wrapper around the external
//! stack-transform engine (out of scope, §1/§4.4) — the adapter itself
//! does no transformation, only the bookkeeping the external engine can't
//! do: patching the destination `pc` to the resumption trampoline and
//! extracting `sp`/`fp` for the caller.

use crate::arch::SupportedArch;
use crate::registers::{RegisterSet, RegisterUnion};
use crate::trampoline;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RewriteError;

impl std::fmt::Display for RewriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("stack transform engine failed to rewrite the register set")
    }
}

impl std::error::Error for RewriteError {}

/// Result of a successful rewrite: the destination register set (with
/// `pc` already patched to the trampoline) plus the `sp`/`fp` values the
/// shim publishes for diagnostics (§4.4 items 2-3).
pub struct Rewritten {
    pub regs: RegisterSet,
    pub sp: u64,
    pub fp: u64,
}

#[cfg_attr(test, allow(dead_code))]
fn arch_tag(arch: SupportedArch) -> u32 {
    match arch {
        SupportedArch::Aarch64 => 0,
        SupportedArch::Powerpc64 => 1,
        SupportedArch::X86_64 => 2,
    }
}

#[cfg(not(test))]
mod engine {
    use super::RegisterUnion;

    extern "C" {
        /// `rewrite_stack(src_regs, dst_regs_out, dst_arch) -> success_boolean`
        /// (§6 "External rewriter"). Out of scope: provided by the
        /// stack-transform engine linked into the final binary. Takes the
        /// bare per-ISA register union — no arch tag, no wrapper — matching
        /// `migrate.c`'s `REWRITE_STACK` call, which passes a plain
        /// `struct regset_t *` with `dst_arch` conveyed only through the
        /// separate third parameter.
        fn rewrite_stack(
            src_regs: *const RegisterUnion,
            dst_regs_out: *mut RegisterUnion,
            dst_arch: u32,
        ) -> std::os::raw::c_int;
    }

    pub unsafe fn call(src: *const RegisterUnion, dst: *mut RegisterUnion, dst_arch: u32) -> bool {
        rewrite_stack(src, dst, dst_arch) != 0
    }
}

/// `rewrite(src, dst_arch) -> (dst | FAIL)` (§4.4). Delegates to the
/// external engine, then patches `pc` to the destination trampoline and
/// extracts `sp`/`fp` in their ISA-specific slots.
pub fn rewrite(src: &RegisterSet, dst_arch: SupportedArch) -> Result<Rewritten, RewriteError> {
    let mut dst = RegisterSet::zeroed(dst_arch);

    #[cfg(not(test))]
    let ok = unsafe { engine::call(src.raw_ptr(), dst.raw_mut_ptr(), arch_tag(dst_arch)) };
    #[cfg(test)]
    let ok = {
        let _ = src;
        test_double::should_succeed()
    };

    if !ok {
        return Err(RewriteError);
    }

    dst.set_pc(trampoline::address_for(dst_arch));
    let sp = dst.sp();
    let fp = dst.fp();
    Ok(Rewritten { regs: dst, sp, fp })
}

#[cfg(test)]
pub mod test_double {
    use std::cell::Cell;

    thread_local! {
        static SUCCEED: Cell<bool> = Cell::new(true);
    }

    pub fn set_should_succeed(v: bool) {
        SUCCEED.with(|c| c.set(v));
    }

    pub fn should_succeed() -> bool {
        SUCCEED.with(|c| c.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::NATIVE_ARCH;

    #[test]
    fn failure_surfaces_as_rewrite_error() {
        test_double::set_should_succeed(false);
        let src = RegisterSet::zeroed(NATIVE_ARCH);
        let result = rewrite(&src, SupportedArch::X86_64);
        assert!(result.is_err());
        test_double::set_should_succeed(true);
    }

    #[test]
    fn success_patches_pc_to_trampoline() {
        test_double::set_should_succeed(true);
        let src = RegisterSet::zeroed(NATIVE_ARCH);
        let rewritten = rewrite(&src, SupportedArch::X86_64).unwrap();
        assert_eq!(rewritten.regs.pc(), trampoline::address_for(SupportedArch::X86_64));
    }
}
