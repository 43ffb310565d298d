//! Handle state machine and collective file lifecycle.
//!
//! `INIT -> [create|open] -> OPEN -> [flush|read|write]* -> CLOSED -> ...`,
//! with `finalize` reachable from anywhere. Lifecycle calls are collective:
//! every rank of the handle's communicator makes the same call with
//! consistent arguments. Closing a handle that holds no open container is a
//! no-op that succeeds; repeated closes are idempotent.

use std::path::Path;
use std::sync::Arc;

use core_comm::{Communicator, Hints};
use core_container::{AccessProperties, Container, ContainerError};
use core_error::{Error, ErrorCode};
use tracing::{debug, info, warn};

use crate::Result;

/// Process-local context binding a duplicated communicator to at most one
/// open container. Not thread-safe; one handle per rank.
pub struct Handle {
    comm: Arc<dyn Communicator>,
    rank: usize,
    size: usize,
    hints: Hints,
    container: Option<Container>,
    layout: usize,
}

impl Handle {
    /// Initialize a handle over `comm`. The communicator is duplicated under
    /// the engine's own name so collective traffic stays isolated from the
    /// caller's.
    pub fn new(comm: &dyn Communicator) -> Result<Self> {
        if comm.size() == 0 {
            return Err(Error::new(
                ErrorCode::Invalid,
                "cannot initialize a handle over an empty process group",
            ));
        }
        let dup = comm.duplicate("esio");
        let (rank, size) = (dup.rank(), dup.size());
        debug!(target: "file", rank, size, "handle_initialized");
        Ok(Self {
            comm: dup,
            rank,
            size,
            hints: Hints::new(),
            container: None,
            layout: 0,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn comm(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    /// The hint bag installed into the container's access properties at the
    /// next create/open. Mutating it after a file is open affects only
    /// subsequent opens.
    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    pub fn set_hint(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.hints.set(key, value);
    }

    pub fn replace_hints(&mut self, hints: Hints) {
        self.hints = hints;
    }

    pub fn is_open(&self) -> bool {
        self.container.is_some()
    }

    /// Active layout tag used when *creating* new fields. Reading always
    /// honors the tag stored with the field.
    pub fn layout(&self) -> usize {
        self.layout
    }

    pub fn set_layout(&mut self, tag: usize) -> Result<()> {
        if tag >= core_layout::layout_count() {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!(
                    "layout tag {tag} outside registry of {}",
                    core_layout::layout_count()
                ),
            ));
        }
        self.layout = tag;
        Ok(())
    }

    fn access_properties(&self) -> AccessProperties {
        AccessProperties::new()
            .with_comm(self.comm.clone())
            .with_hints(self.hints.clone())
    }

    /// Collectively create a container at `path`. Refuses when a container
    /// is already open on this handle, or when `path` exists and `overwrite`
    /// is false.
    pub fn file_create(&mut self, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        let path = path.as_ref();
        if self.container.is_some() {
            return Err(Error::new(
                ErrorCode::Invalid,
                "a file is already open on this handle",
            ));
        }
        let container =
            Container::create(path, overwrite, &self.access_properties()).map_err(|e| match e {
                ContainerError::AlreadyExists(p) => Error::new(
                    ErrorCode::Failed,
                    format!("refusing to overwrite existing file {}", p.display()),
                ),
                other => Error::new(ErrorCode::Failed, format!("file create failed: {other}")),
            })?;
        info!(target: "file", path = %path.display(), overwrite, "file_created");
        self.container = Some(container);
        Ok(())
    }

    /// Collectively open an existing container, read-only unless `readwrite`.
    pub fn file_open(&mut self, path: impl AsRef<Path>, readwrite: bool) -> Result<()> {
        let path = path.as_ref();
        if self.container.is_some() {
            return Err(Error::new(
                ErrorCode::Invalid,
                "a file is already open on this handle",
            ));
        }
        let container = Container::open(path, readwrite, &self.access_properties())
            .map_err(|e| Error::new(ErrorCode::Failed, format!("file open failed: {e}")))?;
        info!(target: "file", path = %path.display(), readwrite, "file_opened");
        self.container = Some(container);
        Ok(())
    }

    /// Collectively commit all pending state to disk without closing.
    pub fn file_flush(&mut self) -> Result<()> {
        let Some(container) = self.container.as_mut() else {
            return Err(Error::new(ErrorCode::Invalid, "no file open on this handle"));
        };
        container
            .flush()
            .map_err(|e| Error::new(ErrorCode::Failed, format!("file flush failed: {e}")))?;
        debug!(target: "file", "file_flushed");
        Ok(())
    }

    /// Collectively close the open container. A handle with nothing open
    /// closes successfully; `close; close` returns `Ok` twice.
    pub fn file_close(&mut self) -> Result<()> {
        match self.container.take() {
            Some(container) => {
                let path = container.path().to_path_buf();
                container
                    .close()
                    .map_err(|e| Error::new(ErrorCode::Failed, format!("file close failed: {e}")))?;
                info!(target: "file", path = %path.display(), "file_closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Tear the handle down, collectively force-closing any still-open
    /// container. Errors during the forced close are reported and discarded.
    pub fn finalize(mut self) {
        if let Some(container) = self.container.take() {
            warn!(
                target: "file",
                path = %container.path().display(),
                "finalize_forced_close"
            );
            if let Err(e) = container.close() {
                tracing::error!(target: "file", error = %e, "forced_close_failed");
            }
        }
        debug!(target: "file", "handle_finalized");
    }

    pub(crate) fn container(&self) -> Result<&Container> {
        self.container
            .as_ref()
            .ok_or_else(|| Error::new(ErrorCode::Invalid, "no file open on this handle"))
    }

    pub(crate) fn container_mut(&mut self) -> Result<&mut Container> {
        self.container
            .as_mut()
            .ok_or_else(|| Error::new(ErrorCode::Invalid, "no file open on this handle"))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        // Unlike `finalize`, drop may run on a single rank (unwind, early
        // return); the container's own drop persists what it can without
        // any collective rendezvous.
        if let Some(container) = self.container.take() {
            warn!(
                target: "file",
                path = %container.path().display(),
                "handle_dropped_with_open_file"
            );
            drop(container);
        }
    }
}
