//! Shared fixtures for the engine integration tests.

use std::path::PathBuf;

use core_engine::{Handle, SelfComm, SubBlock};

/// Fresh scratch directory plus a container path inside it.
pub fn scratch(name: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("scratch dir");
    let path = dir.path().join(name);
    (dir, path)
}

/// Single-process handle.
pub fn handle() -> Handle {
    Handle::new(&SelfComm::default()).expect("handle over self comm")
}

/// A direction owned whole by this rank, tight in memory.
pub fn whole(extent: usize) -> SubBlock {
    SubBlock::new(extent, 0, extent, 0)
}
