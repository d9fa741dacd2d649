//! User-space runtime for migrating a live thread of a running process
//! between heterogeneous-ISA nodes of a distributed single-system-image
//! cluster (Popcorn Linux's `libmigrate`).
//!
//! At a chosen program point, a thread is suspended, its machine state
//! transformed into an equivalent state for a different ISA, and resumed
//! on a remote node so execution continues as if nothing had happened.
//! The public surface is three entry points — [`check_migrate`],
//! [`migrate`], [`migrate_schedule`] — plus the read-only topology
//! queries [`node_available`], [`current_arch`], [`current_nid`].
//!
//! Out of scope: the stack-transformation engine itself (consumed as an
//! `extern "C"` black box, [`rewrite`]), the kernel syscalls that expose
//! node topology/thread status/the migration primitive ([`sys`]), the
//! region-to-node scheduling table ([`schedule`]), and the build tooling
//! that links per-ISA sibling binaries at consistent symbol addresses
//! ([`trampoline`]).

#![cfg_attr(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "powerpc64"), feature(naked_functions))]

#[macro_use]
pub mod log;

pub mod arch;
pub mod bootstrap;
pub mod capture;
pub mod kernel_abi;
pub mod registers;
pub mod rewrite;
pub mod schedule;
pub mod selector;
pub mod shim;
pub mod sys;
pub mod thread_status;
pub mod topology;
pub mod trampoline;

pub use arch::Arch;
pub use shim::{check_migrate, migrate, migrate_schedule};
pub use topology::{current_arch, node_available};
pub use thread_status::current_nid;
