//! C1: the topology cache. Process-wide, write-once, populated from a
//! single `GET_NODE_INFO` syscall before any application thread runs
//! (Design Note "Global topology cache"). Generalizes
//! `isgasho-rd/src/flags.rs`'s `lazy_static! { static ref FLAGS: Flags =
//! init_flags(); }` pattern — write-once-before-threads in place of
//! locking — to the node table instead of CLI flags.

use crate::arch::Arch;
use crate::log::LogLevel::LogError;
use crate::sys::{self, MAX_NODES};
use lazy_static::lazy_static;
use std::convert::TryFrom;

#[derive(Copy, Clone, Debug)]
pub struct NodeInfo {
    pub available: bool,
    pub arch: Arch,
    pub distance: i32,
    /// The raw kernel-reported arch id this entry was decoded from (SPEC_FULL
    /// §3), kept purely for diagnostics — e.g. to tell "kernel reported an
    /// arch id we don't recognize" apart from "kernel reported Unknown"
    /// without re-deriving it from `arch`.
    pub raw_arch: i32,
}

impl Default for NodeInfo {
    fn default() -> Self {
        NodeInfo {
            available: false,
            arch: Arch::Unknown,
            distance: -1,
            raw_arch: -1,
        }
    }
}

struct Topology {
    nodes: [NodeInfo; MAX_NODES],
    default_node: i32,
}

lazy_static! {
    static ref TOPOLOGY: Topology = init_topology();
}

fn init_topology() -> Topology {
    match sys::get_node_info() {
        Ok((origin_nid, raw_nodes)) => {
            let mut nodes = [NodeInfo::default(); MAX_NODES];
            for (slot, raw) in nodes.iter_mut().zip(raw_nodes.iter()) {
                let arch = sys::decode_arch(raw.arch);
                // Invariant (§3): available implies arch != Unknown. A
                // kernel that reports available=1 with an unrecognized
                // arch id is treated as not available — §7's fatal
                // assertion belongs to REWRITE dispatch, not here.
                let available = raw.available != 0 && arch != Arch::Unknown;
                *slot = NodeInfo {
                    available,
                    arch,
                    distance: raw.distance,
                    raw_arch: raw.arch,
                };
            }
            Topology {
                nodes,
                default_node: origin_nid,
            }
        }
        Err(()) => {
            crate::log!(
                LogError,
                "cannot retrieve Popcorn node information: {}",
                sys::last_os_error()
            );
            Topology {
                nodes: [NodeInfo::default(); MAX_NODES],
                default_node: -1,
            }
        }
    }
}

/// `node_available(nid) -> bool` (§4.2). False for any `nid` outside
/// `[0, MAX_NODES)`.
pub fn node_available(nid: i32) -> bool {
    with_nodes(|nodes| {
        usize::try_from(nid)
            .ok()
            .and_then(|idx| nodes.get(idx))
            .map(|n| n.available)
            .unwrap_or(false)
    })
}

/// The architecture of a given node, or `Unknown` if out of range.
pub fn node_arch(nid: i32) -> Arch {
    with_nodes(|nodes| {
        usize::try_from(nid)
            .ok()
            .and_then(|idx| nodes.get(idx))
            .map(|n| n.arch)
            .unwrap_or(Arch::Unknown)
    })
}

/// Real topology is process-wide and write-once-before-threads (Design
/// Note "Global topology cache"); tests instead want a fresh table per
/// test, so this indirection checks a thread-local override first, the
/// same "test double behind a thin wrapper" seam `sys` uses for syscalls.
fn with_nodes<R>(f: impl FnOnce(&[NodeInfo; MAX_NODES]) -> R) -> R {
    #[cfg(test)]
    {
        if let Some(nodes) = test_override::get() {
            return f(&nodes);
        }
    }
    f(&TOPOLOGY.nodes)
}

/// `current_arch() -> arch` (§4.2): the architecture of the node this
/// thread is currently running on.
pub fn current_arch() -> Arch {
    let nid = crate::thread_status::current_nid();
    if nid < 0 {
        return Arch::Unknown;
    }
    node_arch(nid)
}

/// The node the process originated on, or `-1` if topology init failed.
pub fn default_node() -> i32 {
    TOPOLOGY.default_node
}

#[cfg(test)]
pub mod test_override {
    use super::{NodeInfo, MAX_NODES};
    use std::cell::RefCell;

    thread_local! {
        static OVERRIDE: RefCell<Option<[NodeInfo; MAX_NODES]>> = RefCell::new(None);
    }

    pub fn set(nodes: [NodeInfo; MAX_NODES]) {
        OVERRIDE.with(|cell| *cell.borrow_mut() = Some(nodes));
    }

    pub fn clear() {
        OVERRIDE.with(|cell| *cell.borrow_mut() = None);
    }

    pub fn get() -> Option<[NodeInfo; MAX_NODES]> {
        OVERRIDE.with(|cell| *cell.borrow())
    }
}
