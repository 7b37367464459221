//! Executable code-memory backend for the Kestrel dynamic recompiler.
//!
//! Allocates, aligns, protects, and releases the pages translated host code
//! is written into and executed from. Allocation and reprotection failures
//! are unrecoverable by policy: the backend reports a diagnostic with the
//! platform's error description and aborts rather than handing the
//! translator memory it cannot trust.

/// Region handles, protection states, and allocation kinds.
pub mod region;
pub use region::{AllocationKind, CodeRegion, Protection};

/// Platform memory-environment capability contract.
pub mod env;
pub use env::{LowHintSupport, MemoryEnv};

/// Host (Unix) implementation of the memory environment.
#[cfg(unix)]
pub mod host;
#[cfg(unix)]
pub use host::HostMemory;

/// Page allocation front-end with the low-address placement cursor.
pub mod alloc;
pub use alloc::{CodeAllocator, LOW_PLACEMENT_BASE, LOW_PLACEMENT_LIMIT};

/// In-place protection transitions for live regions.
pub mod protect;
pub use protect::ProtectionController;

mod diag;

#[cfg(test)]
pub(crate) mod testenv;

#[cfg(test)]
use env_logger as _;
#[cfg(test)]
use rstest as _;
