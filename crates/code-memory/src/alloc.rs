//! Page allocation front-end with the low-address placement cursor.

use crate::diag::die;
use crate::env::{LowHintSupport, MemoryEnv};
#[cfg(unix)]
use crate::host::HostMemory;
use crate::region::{AllocationKind, CodeRegion, Protection};

/// First address tried when steering executable pages toward low memory on
/// environments without a native placement flag.
pub const LOW_PLACEMENT_BASE: usize = 512 * 1024 * 1024;

/// Ceiling for low-placed executable memory on 64-bit hosts. Translated code
/// reached through short-range relative branches must stay below 2 GiB.
pub const LOW_PLACEMENT_LIMIT: usize = 0x8000_0000;

const fn round_up_to_page(value: usize, page: usize) -> usize {
    (value + page - 1) & !(page - 1)
}

/// Requests pages from the operating environment for translated code and its
/// side tables.
///
/// The allocator is stateless apart from the low-address cursor, which is an
/// instance field so independent allocators never interfere. Regions are
/// handed to the caller outright; nothing here tracks them afterwards.
///
/// Inability to obtain memory is unrecoverable: every allocation either
/// returns a valid region or reports a fatal diagnostic, so callers never
/// see a null result.
#[derive(Debug)]
pub struct CodeAllocator<E> {
    env: E,
    low_cursor: Option<usize>,
}

#[cfg(unix)]
impl CodeAllocator<HostMemory> {
    /// Allocator over the process's own virtual memory.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_env(HostMemory)
    }
}

#[cfg(unix)]
impl Default for CodeAllocator<HostMemory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MemoryEnv> CodeAllocator<E> {
    /// Allocator over a caller-supplied environment.
    #[must_use]
    pub const fn with_env(env: E) -> Self {
        Self {
            env,
            low_cursor: None,
        }
    }

    /// The underlying environment.
    #[must_use]
    pub const fn env(&self) -> &E {
        &self.env
    }

    /// Returns `true` when low-address placement requests have any effect in
    /// this environment, natively or through the cursor workaround.
    #[must_use]
    pub fn supports_low_address_hint(&self) -> bool {
        !matches!(self.env.low_hint_support(), LowHintSupport::Unsupported)
    }

    /// Allocates `len` bytes of read/write/execute pages.
    ///
    /// `prefer_low` asks for placement below [`LOW_PLACEMENT_LIMIT`] so the
    /// region stays reachable by short-range relative branches. Where the
    /// environment lacks a native flag for that, successive low allocations
    /// are steered contiguously upward from [`LOW_PLACEMENT_BASE`] by an
    /// internal cursor that advances by the page-rounded size. The hint is
    /// best-effort; consult [`Self::supports_low_address_hint`] to learn
    /// whether it can work at all.
    ///
    /// # Panics
    ///
    /// Fatal when the environment cannot supply the pages, when `len` is
    /// zero, or when a supported low-placement request still yields an
    /// address at or above the promised limit on a 64-bit host.
    pub fn alloc_executable(&mut self, len: usize, prefer_low: bool) -> CodeRegion {
        if len == 0 {
            die("executable allocation of zero bytes requested");
        }

        let support = self.env.low_hint_support();
        let page = self.env.page_size();

        let hint = if prefer_low && matches!(support, LowHintSupport::CursorWorkaround) {
            let cursor = self
                .low_cursor
                .unwrap_or_else(|| round_up_to_page(LOW_PLACEMENT_BASE, page));
            self.low_cursor = Some(cursor);
            Some(cursor)
        } else {
            None
        };
        let native_low = prefer_low && matches!(support, LowHintSupport::Native);

        let ptr = match self
            .env
            .map_pages(len, Protection::ReadWriteExecute, hint, native_low)
        {
            Ok(ptr) => ptr,
            Err(err) => die(&format!(
                "failed to map {len} bytes of executable memory: {err}"
            )),
        };

        if let Some(cursor) = hint {
            self.low_cursor = Some(round_up_to_page(cursor + len, page));
        }

        let limit_promised = prefer_low && !matches!(support, LowHintSupport::Unsupported);
        check_low_limit(ptr, limit_promised);

        CodeRegion::from_raw(
            ptr,
            len,
            Protection::ReadWriteExecute,
            AllocationKind::Executable,
        )
    }

    /// Allocates `len` bytes of read/write pages with no execute permission.
    ///
    /// # Panics
    ///
    /// Fatal when the environment cannot supply the pages or `len` is zero.
    pub fn alloc_plain(&mut self, len: usize) -> CodeRegion {
        if len == 0 {
            die("plain allocation of zero bytes requested");
        }
        match self.env.map_pages(len, Protection::ReadWrite, None, false) {
            Ok(ptr) => CodeRegion::from_raw(ptr, len, Protection::ReadWrite, AllocationKind::Plain),
            Err(err) => die(&format!("failed to map {len} bytes of plain memory: {err}")),
        }
    }

    /// Allocates `len` bytes whose base address is a multiple of `align`.
    ///
    /// # Panics
    ///
    /// Fatal when the environment cannot supply the memory, `len` is zero,
    /// or `align` is not a power of two.
    pub fn alloc_aligned(&mut self, len: usize, align: usize) -> CodeRegion {
        if len == 0 {
            die("aligned allocation of zero bytes requested");
        }
        if !align.is_power_of_two() {
            die(&format!(
                "aligned allocation requested with non-power-of-two alignment {align}"
            ));
        }
        match self.env.alloc_aligned(len, align) {
            Ok(ptr) => {
                CodeRegion::from_raw(ptr, len, Protection::ReadWrite, AllocationKind::Aligned)
            }
            Err(err) => die(&format!(
                "failed to allocate {len} bytes aligned to {align}: {err}"
            )),
        }
    }

    /// Releases a page-mapped region. Empty regions are accepted and ignored.
    ///
    /// # Panics
    ///
    /// Fatal when the region came from the aligned path, or when the
    /// environment refuses the unmap.
    pub fn free(&mut self, region: CodeRegion) {
        if region.is_empty() {
            return;
        }
        match region.kind() {
            AllocationKind::Executable | AllocationKind::Plain => {
                if let Err(err) = self.env.unmap_pages(region.as_ptr(), region.len()) {
                    die(&format!(
                        "failed to unmap {len}-byte region at {ptr:p}: {err}",
                        len = region.len(),
                        ptr = region.as_ptr(),
                    ));
                }
            }
            AllocationKind::Aligned => {
                die("aligned region released through the page-unmap path");
            }
        }
    }

    /// Releases an aligned region. Empty regions are accepted and ignored.
    ///
    /// # Panics
    ///
    /// Fatal when the region came from the page-mapping path, or when the
    /// environment refuses the release.
    pub fn free_aligned(&mut self, region: CodeRegion) {
        if region.is_empty() {
            return;
        }
        match region.kind() {
            AllocationKind::Aligned => {
                if let Err(err) = self.env.free_aligned(region.as_ptr()) {
                    die(&format!(
                        "failed to release aligned region at {ptr:p}: {err}",
                        ptr = region.as_ptr(),
                    ));
                }
            }
            AllocationKind::Executable | AllocationKind::Plain => {
                die("page-mapped region released through the aligned path");
            }
        }
    }
}

#[cfg(target_pointer_width = "64")]
fn check_low_limit(ptr: *mut u8, limit_promised: bool) {
    if limit_promised && ptr as usize >= LOW_PLACEMENT_LIMIT {
        die(&format!(
            "low-address executable memory ended up at {ptr:p}, at or above the 2 GiB limit"
        ));
    }
}

#[cfg(not(target_pointer_width = "64"))]
fn check_low_limit(_ptr: *mut u8, _limit_promised: bool) {}
