//! Host (Unix) implementation of the memory environment.

use std::io;
use std::ptr;

use crate::env::{LowHintSupport, MemoryEnv};
use crate::region::Protection;

/// The process's own virtual-memory interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostMemory;

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
const HOST_LOW_HINT: LowHintSupport = LowHintSupport::Native;
#[cfg(all(not(target_os = "linux"), target_arch = "x86_64"))]
const HOST_LOW_HINT: LowHintSupport = LowHintSupport::CursorWorkaround;
#[cfg(not(target_arch = "x86_64"))]
const HOST_LOW_HINT: LowHintSupport = LowHintSupport::Unsupported;

const fn prot_flags(protection: Protection) -> libc::c_int {
    match protection {
        Protection::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
        Protection::ReadExecute => libc::PROT_READ | libc::PROT_EXEC,
        Protection::ReadWriteExecute => libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
    }
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn map_flags(protection: Protection, low: bool) -> libc::c_int {
    let _ = protection;
    let mut flags = libc::MAP_ANON | libc::MAP_PRIVATE;
    if low {
        flags |= libc::MAP_32BIT;
    }
    flags
}

#[cfg(target_os = "macos")]
fn map_flags(protection: Protection, low: bool) -> libc::c_int {
    let _ = low;
    let mut flags = libc::MAP_ANON | libc::MAP_PRIVATE;
    // Hardened runtimes only hand out executable anonymous pages through the
    // JIT mapping flag.
    if protection.is_executable() {
        flags |= libc::MAP_JIT;
    }
    flags
}

#[cfg(not(any(all(target_os = "linux", target_arch = "x86_64"), target_os = "macos")))]
fn map_flags(_protection: Protection, _low: bool) -> libc::c_int {
    libc::MAP_ANON | libc::MAP_PRIVATE
}

impl MemoryEnv for HostMemory {
    fn page_size(&self) -> usize {
        // SAFETY: sysconf has no memory-safety preconditions.
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        usize::try_from(raw).unwrap_or(4096)
    }

    fn low_hint_support(&self) -> LowHintSupport {
        HOST_LOW_HINT
    }

    fn map_pages(
        &mut self,
        len: usize,
        protection: Protection,
        hint: Option<usize>,
        low: bool,
    ) -> io::Result<*mut u8> {
        let addr = hint.map_or(ptr::null_mut(), |address| address as *mut libc::c_void);
        // SAFETY: anonymous private mapping; the kernel validates the
        // arguments and a placement hint is only a suggestion, never
        // MAP_FIXED, so existing mappings cannot be clobbered.
        let mapped = unsafe {
            libc::mmap(
                addr,
                len,
                prot_flags(protection),
                map_flags(protection, low),
                -1,
                0,
            )
        };
        if mapped == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(mapped.cast::<u8>())
    }

    fn unmap_pages(&mut self, ptr: *mut u8, len: usize) -> io::Result<()> {
        // SAFETY: the caller hands back a mapping previously returned by
        // `map_pages` with its original length.
        let rc = unsafe { libc::munmap(ptr.cast::<libc::c_void>(), len) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn alloc_aligned(&mut self, len: usize, align: usize) -> io::Result<*mut u8> {
        let mut out: *mut libc::c_void = ptr::null_mut();
        // SAFETY: `out` is a valid location for the result pointer; the
        // alignment contract is posix_memalign's to check.
        let rc = unsafe { libc::posix_memalign(&mut out, align, len) };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        Ok(out.cast::<u8>())
    }

    fn free_aligned(&mut self, ptr: *mut u8) -> io::Result<()> {
        // SAFETY: the caller hands back memory previously returned by
        // `alloc_aligned`.
        unsafe { libc::free(ptr.cast::<libc::c_void>()) };
        Ok(())
    }

    fn protect(&mut self, ptr: *mut u8, len: usize, protection: Protection) -> io::Result<()> {
        // SAFETY: the caller hands in a live mapping previously returned by
        // `map_pages` with its original length.
        let rc = unsafe { libc::mprotect(ptr.cast::<libc::c_void>(), len, prot_flags(protection)) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
