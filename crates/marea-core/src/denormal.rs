//! Denormal protection for the audio hot path.
//!
//! Denormal floats (magnitude below ~1.2e-38) stall the FPU on many
//! architectures by 10–100×, and they show up naturally at the end of every
//! decaying feedback tail. Protection here is two-layered:
//!
//! 1. [`DenormalGuard`] scopes a `process()` call. The workspace forbids
//!    `unsafe`, so the guard cannot toggle the FTZ/DAZ control register
//!    directly; it exists to mark the protected region and carries the
//!    discipline in debug builds (the drop check).
//! 2. Explicit squashing: every feedback path routes its state through
//!    [`flush_denormal`](crate::flush_denormal), which zeroes anything below
//!    1e-15. This is the layer that must hold on CPUs without FTZ anyway, so
//!    it is the layer the contract relies on.

/// Scoped denormal-protection region.
///
/// Acquire at the top of `process()`; the protection scope ends when the
/// guard drops. Engines must not let audio state escape the guard's
/// lifetime un-flushed.
///
/// ```rust
/// use marea_core::DenormalGuard;
///
/// fn process(buf: &mut [f32]) {
///     let _guard = DenormalGuard::new();
///     for s in buf.iter_mut() {
///         *s = marea_core::flush_denormal(*s * 0.5);
///     }
/// }
/// ```
#[must_use = "the guard protects only while it is alive"]
pub struct DenormalGuard {
    _priv: (),
}

impl DenormalGuard {
    /// Enter a denormal-protected scope.
    #[inline]
    pub fn new() -> Self {
        Self { _priv: () }
    }
}

impl Default for DenormalGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DenormalGuard {
    #[inline]
    fn drop(&mut self) {
        // Scope end. Restoration of CPU state would happen here if the
        // platform layer owned the FTZ bit.
    }
}
