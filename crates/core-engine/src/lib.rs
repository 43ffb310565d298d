//! The transfer engine: handle lifecycle, field metadata, and the
//! distributed read/write paths.
//!
//! A [`Handle`] binds a duplicated communicator to at most one open
//! container and carries the active write-layout tag. Field operations are
//! collective across the handle's communicator; every rank supplies its own
//! local sub-block of the global `(C, B, A)` extent and the engine maps it
//! onto the on-disk arrangement through the layout registry. Shape truth
//! lives in the per-field metadata tuple on disk, re-probed on every
//! operation and never cached, so a file reopened under a different
//! decomposition or a different active layout reads back identically.
//!
//! Lower-rank operations (planes, lines, scalar/vector attributes, strings)
//! are degenerate projections of the 3-D field path and live on the same
//! handle.

mod attribute;
mod field;
mod handle;
mod metadata;
mod reduce;

pub use handle::Handle;
pub use metadata::{FieldMeta, METADATA_NAME};

// The vocabulary types callers need alongside the handle.
pub use core_comm::{Communicator, Hints, LocalComm, LocalGroup, SelfComm};
pub use core_container::Element;
pub use core_error::{
    default_hook, noop_hook, set_error_hook, Error, ErrorCode, ErrorHook, ErrorReport,
    SilenceErrors,
};
pub use core_layout::{layout_count, SubBlock};

pub type Result<T> = std::result::Result<T, Error>;

/// Map a driver failure onto the environment outcome code.
#[track_caller]
pub(crate) fn failed(e: core_container::ContainerError) -> Error {
    Error::new(ErrorCode::Failed, format!("container driver: {e}"))
}
