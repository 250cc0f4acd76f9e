//! One-export-at-a-time guard.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{RenderError, RenderResult};

/// Tracks whether an export is running.
#[derive(Debug, Default)]
pub struct ExportLock {
    busy: AtomicBool,
}

impl ExportLock {
    /// An idle lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the lock for one export.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Busy`] while another guard is alive.
    pub fn try_acquire(&self) -> RenderResult<ExportGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RenderError::Busy)?;
        Ok(ExportGuard { busy: &self.busy })
    }

    /// Whether an export is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of an export. Releases the lock on drop, including
/// when the export fails.
#[derive(Debug)]
pub struct ExportGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
