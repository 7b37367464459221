//! In-place protection transitions for live regions.

use crate::diag::die;
use crate::env::MemoryEnv;
#[cfg(unix)]
use crate::host::HostMemory;
use crate::region::{CodeRegion, Protection};

/// Switches a region between writable and executable states without moving
/// or resizing it.
///
/// Each call is atomic at the environment level, and the region's recorded
/// protection is updated only after the environment accepts the change, so
/// the two can never disagree. Ordering a region's transitions against
/// reads, writes, and execution from other threads is the surrounding
/// translator's responsibility; in particular no thread may execute from a
/// region while it is writable.
#[derive(Debug)]
pub struct ProtectionController<E> {
    env: E,
}

#[cfg(unix)]
impl ProtectionController<HostMemory> {
    /// Controller over the process's own virtual memory.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_env(HostMemory)
    }
}

#[cfg(unix)]
impl Default for ProtectionController<HostMemory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MemoryEnv> ProtectionController<E> {
    /// Controller over a caller-supplied environment.
    #[must_use]
    pub const fn with_env(env: E) -> Self {
        Self { env }
    }

    /// The underlying environment.
    #[must_use]
    pub const fn env(&self) -> &E {
        &self.env
    }

    /// Makes the region writable for patching, optionally keeping execute
    /// permission. Empty regions are accepted and ignored.
    ///
    /// # Panics
    ///
    /// Fatal when the environment refuses the protection change; a
    /// translator cannot safely patch code it cannot make writable.
    pub fn make_writable(&mut self, region: &mut CodeRegion, keep_executable: bool) {
        let target = if keep_executable {
            Protection::ReadWriteExecute
        } else {
            Protection::ReadWrite
        };
        self.transition(region, target);
    }

    /// Makes the region executable for running translated code, optionally
    /// keeping write permission. Empty regions are accepted and ignored.
    ///
    /// # Panics
    ///
    /// Fatal when the environment refuses the protection change; a
    /// translator cannot safely run code it could not seal against writes.
    pub fn make_executable(&mut self, region: &mut CodeRegion, allow_write: bool) {
        let target = if allow_write {
            Protection::ReadWriteExecute
        } else {
            Protection::ReadExecute
        };
        self.transition(region, target);
    }

    fn transition(&mut self, region: &mut CodeRegion, target: Protection) {
        if region.is_empty() {
            return;
        }
        if let Err(err) = self.env.protect(region.as_ptr(), region.len(), target) {
            die(&format!(
                "failed to reprotect {len}-byte region at {ptr:p} to {target:?}: {err}",
                len = region.len(),
                ptr = region.as_ptr(),
            ));
        }
        region.set_protection(target);
    }
}

#[cfg(test)]
mod tests {
    use super::ProtectionController;
    use crate::alloc::CodeAllocator;
    use crate::env::LowHintSupport;
    use crate::region::{CodeRegion, Protection};
    use crate::testenv::{EnvCall, MockEnv};

    fn region() -> CodeRegion {
        let mut allocator = CodeAllocator::with_env(MockEnv::new(LowHintSupport::Unsupported));
        allocator.alloc_executable(4096, false)
    }

    #[test]
    fn make_executable_seals_against_writes_by_default() {
        let mut region = region();
        let mut controller = ProtectionController::with_env(MockEnv::new(LowHintSupport::Unsupported));

        controller.make_executable(&mut region, false);

        assert_eq!(region.protection(), Protection::ReadExecute);
        assert_eq!(
            controller.env().calls[0],
            EnvCall::Protect {
                addr: region.as_ptr() as usize,
                len: 4096,
                protection: Protection::ReadExecute,
            }
        );
    }

    #[test]
    fn make_executable_can_keep_write_permission() {
        let mut region = region();
        let mut controller = ProtectionController::with_env(MockEnv::new(LowHintSupport::Unsupported));

        controller.make_executable(&mut region, true);
        assert_eq!(region.protection(), Protection::ReadWriteExecute);
    }

    #[test]
    fn make_writable_drops_execute_permission_by_default() {
        let mut region = region();
        let mut controller = ProtectionController::with_env(MockEnv::new(LowHintSupport::Unsupported));

        controller.make_writable(&mut region, false);
        assert_eq!(region.protection(), Protection::ReadWrite);
    }

    #[test]
    fn make_writable_can_keep_execute_permission() {
        let mut region = region();
        let mut controller = ProtectionController::with_env(MockEnv::new(LowHintSupport::Unsupported));

        controller.make_writable(&mut region, true);
        assert_eq!(region.protection(), Protection::ReadWriteExecute);
    }

    #[test]
    fn empty_regions_are_ignored() {
        let mut region = CodeRegion::empty();
        let mut controller = ProtectionController::with_env(MockEnv::new(LowHintSupport::Unsupported));

        controller.make_executable(&mut region, false);
        controller.make_writable(&mut region, true);
        assert!(controller.env().calls.is_empty());
    }

    #[test]
    #[should_panic(expected = "failed to reprotect")]
    fn refused_protection_change_is_fatal() {
        let mut region = region();
        let mut env = MockEnv::new(LowHintSupport::Unsupported);
        env.fail_protect = true;
        let mut controller = ProtectionController::with_env(env);

        controller.make_executable(&mut region, false);
    }

    #[test]
    fn recorded_state_tracks_a_full_patch_cycle() {
        let mut region = region();
        let mut controller = ProtectionController::with_env(MockEnv::new(LowHintSupport::Unsupported));

        controller.make_executable(&mut region, false);
        assert!(!region.protection().is_writable());

        controller.make_writable(&mut region, false);
        assert!(region.protection().is_writable());
        assert!(!region.protection().is_executable());

        controller.make_executable(&mut region, false);
        assert!(region.protection().is_executable());
    }
}
