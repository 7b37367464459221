//! Recording memory environment for policy tests.
//!
//! Returns synthetic addresses that are never dereferenced; tests that
//! exercise real page contents go through the host environment instead.

use std::io;

use crate::env::{LowHintSupport, MemoryEnv};
use crate::region::Protection;

/// One observed environment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnvCall {
    Map {
        len: usize,
        protection: Protection,
        hint: Option<usize>,
        low: bool,
    },
    Unmap {
        addr: usize,
        len: usize,
    },
    AllocAligned {
        len: usize,
        align: usize,
    },
    FreeAligned {
        addr: usize,
    },
    Protect {
        addr: usize,
        len: usize,
        protection: Protection,
    },
}

pub(crate) struct MockEnv {
    pub page_size: usize,
    pub support: LowHintSupport,
    pub next_addr: usize,
    pub fail_map: bool,
    pub fail_protect: bool,
    pub calls: Vec<EnvCall>,
}

impl MockEnv {
    pub fn new(support: LowHintSupport) -> Self {
        Self {
            page_size: 4096,
            support,
            next_addr: 0x0010_0000,
            fail_map: false,
            fail_protect: false,
            calls: Vec::new(),
        }
    }

    fn bump(&mut self, len: usize, align: usize) -> usize {
        let addr = self.next_addr.next_multiple_of(align);
        self.next_addr = addr + len.max(self.page_size);
        addr
    }
}

impl MemoryEnv for MockEnv {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn low_hint_support(&self) -> LowHintSupport {
        self.support
    }

    fn map_pages(
        &mut self,
        len: usize,
        protection: Protection,
        hint: Option<usize>,
        low: bool,
    ) -> io::Result<*mut u8> {
        self.calls.push(EnvCall::Map {
            len,
            protection,
            hint,
            low,
        });
        if self.fail_map {
            return Err(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "mock environment refused the mapping",
            ));
        }
        let addr = match hint {
            Some(address) => address,
            None => self.bump(len, self.page_size),
        };
        Ok(addr as *mut u8)
    }

    fn unmap_pages(&mut self, ptr: *mut u8, len: usize) -> io::Result<()> {
        self.calls.push(EnvCall::Unmap {
            addr: ptr as usize,
            len,
        });
        Ok(())
    }

    fn alloc_aligned(&mut self, len: usize, align: usize) -> io::Result<*mut u8> {
        self.calls.push(EnvCall::AllocAligned { len, align });
        let addr = self.bump(len, align);
        Ok(addr as *mut u8)
    }

    fn free_aligned(&mut self, ptr: *mut u8) -> io::Result<()> {
        self.calls.push(EnvCall::FreeAligned {
            addr: ptr as usize,
        });
        Ok(())
    }

    fn protect(&mut self, ptr: *mut u8, len: usize, protection: Protection) -> io::Result<()> {
        self.calls.push(EnvCall::Protect {
            addr: ptr as usize,
            len,
            protection,
        });
        if self.fail_protect {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mock environment refused the protection change",
            ));
        }
        Ok(())
    }
}
