//! Parallel I/O for simulation restart files.
//!
//! An SPMD job writes and reads large distributed 3-D fields to a single
//! shared, self-describing container: each rank contributes only its local,
//! possibly strided sub-block, and collective transfers assemble the global
//! dataset on disk. Fields carry their own metadata, so a file written under
//! one decomposition or on-disk layout reads back under any other.
//!
//! The message-passing substrate and the container's native parallel driver
//! sit behind traits; the built-in single-process and in-process group
//! communicators plus the single-file driver make the whole engine usable
//! (and testable) without any system MPI or HDF5 installation.
//!
//! ```no_run
//! use esio::{Handle, SelfComm, SubBlock};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut h = Handle::new(&SelfComm::default())?;
//!     h.file_create("restart.h5", true)?;
//!
//!     // This rank owns the whole 4x3x2 field, tight in memory.
//!     let u: Vec<f64> = (0..24).map(f64::from).collect();
//!     let whole = |n| SubBlock::new(n, 0, n, 0);
//!     h.field_write("u", &u, whole(4), whole(3), whole(2))?;
//!     h.attribute_write("time", 0.25f64)?;
//!     h.file_close()?;
//!
//!     // Rotate the fresh file into the retained sequence.
//!     esio::restart_rename("restart.h5", "restart#.h5", 5)?;
//!     Ok(())
//! }
//! ```

pub use core_comm::{Communicator, Hints, LocalComm, LocalGroup, SelfComm};
pub use core_container::Element;
pub use core_engine::{FieldMeta, Handle, METADATA_NAME};
pub use core_error::{
    default_hook, noop_hook, set_error_hook, Error, ErrorCode, ErrorHook, ErrorReport,
    SilenceErrors,
};
pub use core_layout::{layout_count, SubBlock};
pub use core_restart::{next_index, restart_rename};

/// Container vocabulary, re-exported for callers that implement or tune the
/// driver seam directly.
pub mod container {
    pub use core_container::{
        conversion_exists, AccessProperties, Container, ContainerError, Dataset, Dataspace,
        ElementType, ScalarType, Selection, SilenceSink, SlabData, SlabDataMut,
        TransferProperties,
    };
}
