//! Advisory memory reclamation.

/// Hint the allocator to return freed memory to the OS.
///
/// Called after each restart attempt, once the retired core and node
/// resources have been dropped. Best effort and non-blocking; a no-op on
/// platforms without `malloc_trim`.
pub fn reclaim_hint() {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe {
        libc::malloc_trim(0);
    }
    tracing::debug!("Memory reclamation hint issued");
}
