//! Driver error sink.
//!
//! The driver reports failures through a process-wide sink before returning
//! them, mirroring a native container library's auto-reporting error stack.
//! Probing code silences the sink with [`SilenceSink`]; the guard saves
//! nothing but a depth count, so nesting and unwinds restore correctly.

use std::sync::atomic::{AtomicUsize, Ordering};

static SILENCE_DEPTH: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn report(error: &crate::ContainerError) {
    if SILENCE_DEPTH.load(Ordering::Acquire) > 0 {
        return;
    }
    tracing::error!(target: "container", "{error}");
}

/// RAII suppression of the driver sink, used around existence probes.
pub struct SilenceSink(());

impl SilenceSink {
    pub fn new() -> Self {
        SILENCE_DEPTH.fetch_add(1, Ordering::AcqRel);
        Self(())
    }
}

impl Default for SilenceSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SilenceSink {
    fn drop(&mut self) {
        SILENCE_DEPTH.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_nests_and_restores() {
        assert_eq!(SILENCE_DEPTH.load(Ordering::Acquire), 0);
        {
            let _a = SilenceSink::new();
            let _b = SilenceSink::new();
            assert_eq!(SILENCE_DEPTH.load(Ordering::Acquire), 2);
        }
        assert_eq!(SILENCE_DEPTH.load(Ordering::Acquire), 0);
    }
}
