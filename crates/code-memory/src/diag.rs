//! Fatal diagnostic path for unrecoverable environment failures.

/// Reports `message` through the logging facade and aborts the operation by
/// panicking.
///
/// A translator that cannot obtain code memory, or cannot trust a protection
/// transition it just requested, has no safe way to continue; there is no
/// retry and no degraded mode. Callers include the platform's last-error
/// description in `message` whenever the environment supplies one.
pub(crate) fn die(message: &str) -> ! {
    log::error!("{message}");
    panic!("{message}");
}
