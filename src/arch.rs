//! Instruction-set architecture identifiers.
//!
//! `Arch` is the wire/data-model notion of an ISA (it can be `Unknown`,
//! e.g. when the kernel fails to report node info). `SupportedArch` is the
//! narrower type that callers which must never observe `Unknown` — the
//! rewriter adapter and the resumption trampolines — take instead, so that
//! "this architecture is one we can actually build a register set for" is
//! checked once at the boundary rather than re-checked at every call site.

use std::fmt;

/// One of the three ISAs this crate knows how to build a register set for,
/// or `Unknown` when the kernel reported something we don't recognize.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Arch {
    Aarch64,
    Powerpc64,
    X86_64,
    Unknown,
}

/// `Arch` restricted to the architectures this crate can build register
/// sets and trampolines for. Constructing one from an `Arch::Unknown` is a
/// programmer error the topology cache should have prevented (§7: "the
/// topology cache should never advertise an unsupported arch as
/// available").
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SupportedArch {
    Aarch64,
    Powerpc64,
    X86_64,
}

impl SupportedArch {
    pub fn as_arch(self) -> Arch {
        match self {
            SupportedArch::Aarch64 => Arch::Aarch64,
            SupportedArch::Powerpc64 => Arch::Powerpc64,
            SupportedArch::X86_64 => Arch::X86_64,
        }
    }
}

impl Arch {
    /// Narrow to `SupportedArch`, or `None` for `Unknown`.
    pub fn supported(self) -> Option<SupportedArch> {
        match self {
            Arch::Aarch64 => Some(SupportedArch::Aarch64),
            Arch::Powerpc64 => Some(SupportedArch::Powerpc64),
            Arch::X86_64 => Some(SupportedArch::X86_64),
            Arch::Unknown => None,
        }
    }

    /// Decode the small integer the kernel's `GET_NODE_INFO` syscall uses
    /// to report a node's architecture.
    pub fn from_raw(v: i32) -> Arch {
        match v {
            0 => Arch::Aarch64,
            1 => Arch::Powerpc64,
            2 => Arch::X86_64,
            _ => Arch::Unknown,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Arch::Aarch64 => "aarch64",
            Arch::Powerpc64 => "powerpc64",
            Arch::X86_64 => "x86_64",
            Arch::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The architecture this binary was actually compiled for. Used by C3
/// (context capture always captures in the native layout) and by the
/// env-range selector (only the local ISA's env-var pair is consulted).
#[cfg(target_arch = "aarch64")]
pub const NATIVE_ARCH: SupportedArch = SupportedArch::Aarch64;
#[cfg(target_arch = "powerpc64")]
pub const NATIVE_ARCH: SupportedArch = SupportedArch::Powerpc64;
#[cfg(target_arch = "x86_64")]
pub const NATIVE_ARCH: SupportedArch = SupportedArch::X86_64;

#[cfg(not(any(
    target_arch = "aarch64",
    target_arch = "powerpc64",
    target_arch = "x86_64"
)))]
compile_error!("migration-shim supports only aarch64, powerpc64 and x86_64 hosts");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_round_trips_supported_archs() {
        assert_eq!(Arch::from_raw(0), Arch::Aarch64);
        assert_eq!(Arch::from_raw(1), Arch::Powerpc64);
        assert_eq!(Arch::from_raw(2), Arch::X86_64);
        assert_eq!(Arch::from_raw(99), Arch::Unknown);
    }

    #[test]
    fn unknown_has_no_supported_arch() {
        assert!(Arch::Unknown.supported().is_none());
    }
}
