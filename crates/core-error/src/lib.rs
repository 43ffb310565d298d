//! Outcome codes and the process-wide error reporting hook.
//!
//! Every public operation in the workspace resolves to a member of the closed
//! `ErrorCode` enumeration. Failures travel two paths at once: the structured
//! `Error` value returned to the caller, and a process-wide hook invoked at
//! the report site with message and source-location context. The default hook
//! forwards to `tracing::error!`; callers that want the historical
//! abort-on-first-error behavior install their own hook.
//!
//! Reporting contract:
//! - `Error::new` captures the caller location (`#[track_caller]`), delivers
//!   the report to the installed hook unless silenced, and returns the value.
//! - `set_error_hook` swaps the hook atomically and hands back the previous
//!   one so callers can restore it.
//! - `SilenceErrors` is an RAII guard suppressing hook delivery for its
//!   lifetime. Suppression nests and is restored on drop, including unwinds.
//!   Existence probes use it so that "absent" never reaches the hook.

use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, RwLock};

/// Closed outcome enumeration. `Success` is guaranteed to be `0`; the
/// non-zero members carry stable discriminants for surface parity with the
/// numeric exit codes of the wrapped operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Operation completed.
    Success = 0,
    /// A required argument was absent or degenerate (empty name, empty buffer).
    Fault = 1,
    /// Bad argument or wrong state for the requested operation.
    Invalid = 2,
    /// A substrate (container driver or message layer) rejected the request.
    Failed = 3,
    /// An internal contract between engine and substrate was broken. A bug.
    Sanity = 4,
    /// Auxiliary allocation failure.
    NoMem = 5,
}

impl ErrorCode {
    /// Numeric exit-code form of the member.
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// The failure value returned by every fallible public operation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} [{code:?} at {file}:{line}]")]
pub struct Error {
    code: ErrorCode,
    message: String,
    file: &'static str,
    line: u32,
}

impl Error {
    /// Build an error, deliver it to the installed hook (unless silenced),
    /// and return it. The report site is the *caller* of this constructor.
    #[track_caller]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let loc = Location::caller();
        let err = Self {
            code,
            message: message.into(),
            file: loc.file(),
            line: loc.line(),
        };
        err.deliver();
        err
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Source location captured at the report site.
    pub fn location(&self) -> (&'static str, u32) {
        (self.file, self.line)
    }

    fn deliver(&self) {
        if SILENCE_DEPTH.load(Ordering::Acquire) > 0 {
            return;
        }
        let hook = HOOK.read().expect("error hook lock poisoned").clone();
        hook(&ErrorReport {
            code: self.code,
            message: &self.message,
            file: self.file,
            line: self.line,
        });
    }
}

/// Borrowed view of a failure handed to the hook.
#[derive(Debug)]
pub struct ErrorReport<'a> {
    pub code: ErrorCode,
    pub message: &'a str,
    pub file: &'static str,
    pub line: u32,
}

/// Hook signature. One hook per process; swapped whole.
pub type ErrorHook = Arc<dyn Fn(&ErrorReport<'_>) + Send + Sync>;

static HOOK: LazyLock<RwLock<ErrorHook>> = LazyLock::new(|| RwLock::new(default_hook()));
static SILENCE_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// The hook installed at startup: structured `tracing` report, no abort.
pub fn default_hook() -> ErrorHook {
    Arc::new(|report| {
        tracing::error!(
            target: "esio",
            code = ?report.code,
            file = report.file,
            line = report.line,
            "{}",
            report.message
        );
    })
}

/// Install `hook` process-wide, returning the previously installed hook.
/// Must not be called while a collective operation is in flight.
pub fn set_error_hook(hook: ErrorHook) -> ErrorHook {
    let mut slot = HOOK.write().expect("error hook lock poisoned");
    std::mem::replace(&mut *slot, hook)
}

/// A hook that drops every report. Useful for callers that inspect return
/// codes exclusively.
pub fn noop_hook() -> ErrorHook {
    Arc::new(|_| {})
}

/// RAII suppression of hook delivery. Nests; restores on drop even when the
/// stack unwinds through the guard.
pub struct SilenceErrors(());

impl SilenceErrors {
    pub fn new() -> Self {
        SILENCE_DEPTH.fetch_add(1, Ordering::AcqRel);
        Self(())
    }
}

impl Default for SilenceErrors {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SilenceErrors {
    fn drop(&mut self) {
        SILENCE_DEPTH.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    // Hook state is process-wide; serialize the tests that touch it.
    static HOOK_TESTS: Mutex<()> = Mutex::new(());

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn default_hook_reports_through_tracing() {
        let _serial = HOOK_TESTS.lock().unwrap();
        let prev = set_error_hook(default_hook());
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::ERROR)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        with_default(subscriber, || {
            let _ = Error::new(ErrorCode::Failed, "substrate rejected the request");
        });
        set_error_hook(prev);

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("ERROR esio:"));
        assert!(log_output.contains("substrate rejected the request"));
        assert!(log_output.contains("code=Failed"));
    }

    fn collecting_hook() -> (ErrorHook, Arc<Mutex<Vec<(ErrorCode, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hook: ErrorHook = Arc::new(move |r| {
            sink.lock().unwrap().push((r.code, r.message.to_string()));
        });
        (hook, seen)
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::Success.as_i32(), 0);
        assert_eq!(ErrorCode::Fault.as_i32(), 1);
        assert_eq!(ErrorCode::Invalid.as_i32(), 2);
        assert_eq!(ErrorCode::Failed.as_i32(), 3);
        assert_eq!(ErrorCode::Sanity.as_i32(), 4);
        assert_eq!(ErrorCode::NoMem.as_i32(), 5);
    }

    #[test]
    fn hook_receives_report_with_location() {
        let _serial = HOOK_TESTS.lock().unwrap();
        let (hook, seen) = collecting_hook();
        let prev = set_error_hook(hook);
        let err = Error::new(ErrorCode::Invalid, "extent mismatch");
        set_error_hook(prev);

        assert_eq!(err.code(), ErrorCode::Invalid);
        let reports = seen.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, ErrorCode::Invalid);
        assert!(reports[0].1.contains("extent mismatch"));
        let (file, line) = err.location();
        assert!(file.ends_with("lib.rs"));
        assert!(line > 0);
    }

    #[test]
    fn silence_guard_suppresses_and_restores() {
        let _serial = HOOK_TESTS.lock().unwrap();
        let (hook, seen) = collecting_hook();
        let prev = set_error_hook(hook);
        {
            let _quiet = SilenceErrors::new();
            let _ = Error::new(ErrorCode::Failed, "probe miss");
        }
        let _ = Error::new(ErrorCode::Failed, "audible");
        set_error_hook(prev);

        let reports = seen.lock().unwrap();
        assert_eq!(reports.len(), 1, "only the post-guard report is delivered");
        assert_eq!(reports[0].1, "audible");
    }

    #[test]
    fn silence_guard_survives_unwind() {
        let _serial = HOOK_TESTS.lock().unwrap();
        let (hook, seen) = collecting_hook();
        let prev = set_error_hook(hook);
        let panicked = std::panic::catch_unwind(|| {
            let _quiet = SilenceErrors::new();
            panic!("mid-probe unwind");
        });
        assert!(panicked.is_err());
        let _ = Error::new(ErrorCode::Failed, "after unwind");
        set_error_hook(prev);

        let reports = seen.lock().unwrap();
        assert_eq!(reports.len(), 1, "suppression must not leak past the unwind");
    }

    #[test]
    fn display_carries_message_and_code() {
        let _serial = HOOK_TESTS.lock().unwrap();
        let prev = set_error_hook(noop_hook());
        let err = Error::new(ErrorCode::Sanity, "metadata sentinel clobbered");
        set_error_hook(prev);
        let text = err.to_string();
        assert!(text.contains("metadata sentinel clobbered"));
        assert!(text.contains("Sanity"));
    }
}
