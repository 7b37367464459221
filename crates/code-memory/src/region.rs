//! Region handles, protection states, and allocation kinds.

use std::{ptr, slice};

use crate::diag::die;

/// Page protection states a region can be in.
///
/// The recorded state must mirror what the operating environment actually
/// enforces; allocation and protection operations are the only places it
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protection {
    /// Readable and writable, not executable.
    ReadWrite,
    /// Readable and executable, not writable.
    ReadExecute,
    /// Readable, writable, and executable.
    ReadWriteExecute,
}

impl Protection {
    /// Returns `true` when writes are permitted.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite | Self::ReadWriteExecute)
    }

    /// Returns `true` when instruction fetch is permitted.
    #[must_use]
    pub const fn is_executable(self) -> bool {
        matches!(self, Self::ReadExecute | Self::ReadWriteExecute)
    }
}

/// Which allocation path produced a region, and therefore which release path
/// must take it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationKind {
    /// Executable pages from the page-mapping path.
    Executable,
    /// Read/write pages from the page-mapping path.
    Plain,
    /// Alignment-constrained memory from the aligned path.
    Aligned,
}

/// A range of addressable bytes owned by whichever component requested it.
///
/// The backend keeps no registry of live regions; the handle itself carries
/// everything release and reprotection need. Ownership is exclusive until
/// the region is passed back to the matching free operation, which is why
/// the handle may travel between translator worker threads.
#[derive(Debug)]
pub struct CodeRegion {
    ptr: *mut u8,
    len: usize,
    protection: Protection,
    kind: AllocationKind,
}

// Exclusive ownership travels with the handle; nothing aliases the mapping.
unsafe impl Send for CodeRegion {}

impl CodeRegion {
    pub(crate) const fn from_raw(
        ptr: *mut u8,
        len: usize,
        protection: Protection,
        kind: AllocationKind,
    ) -> Self {
        Self {
            ptr,
            len,
            protection,
            kind,
        }
    }

    /// A region with no pages behind it. Releasing it is a no-op.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
            protection: Protection::ReadWrite,
            kind: AllocationKind::Plain,
        }
    }

    /// Returns `true` when the region has no pages behind it.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null() || self.len == 0
    }

    /// Base address of the region.
    #[must_use]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Length in bytes, fixed at allocation time.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Currently enforced protection state.
    #[must_use]
    pub const fn protection(&self) -> Protection {
        self.protection
    }

    /// The allocation path that produced this region.
    #[must_use]
    pub const fn kind(&self) -> AllocationKind {
        self.kind
    }

    /// The region's bytes. Every protection state permits reads.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        if self.is_empty() {
            return &[];
        }
        // SAFETY: the handle exclusively owns `len` mapped bytes at `ptr`,
        // and all protection states keep them readable.
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }

    /// The region's bytes for writing.
    ///
    /// # Panics
    ///
    /// Fatal when the current protection state forbids writes; patching a
    /// region that is execute-only must go through a writable transition
    /// first.
    #[must_use]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        if self.is_empty() {
            return &mut [];
        }
        if !self.protection.is_writable() {
            die(&format!(
                "write access to {len}-byte region at {ptr:p} denied: protection is {protection:?}",
                len = self.len,
                ptr = self.ptr,
                protection = self.protection,
            ));
        }
        // SAFETY: the handle exclusively owns `len` mapped bytes at `ptr`,
        // and the enforced protection was just checked to permit writes.
        unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    pub(crate) fn set_protection(&mut self, protection: Protection) {
        self.protection = protection;
    }
}
