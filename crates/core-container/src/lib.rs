//! Hierarchical dataset container seam and the built-in single-file driver.
//!
//! The transfer engine consumes a narrow capability set from its container:
//! create/open/flush/close with collective access properties, typed n-D
//! datasets, hyperslab selections, integer/numeric/text attributes, element
//! type conversion queries, and collective transfers between a memory
//! selection and a file selection. This crate defines those vocabulary types
//! and ships a reference driver storing everything in one self-describing
//! binary file: fixed header, 8-byte-aligned data region, JSON table of
//! contents.
//!
//! Driver collectivity contract:
//! - create/open/flush/close and collective transfers are invoked by every
//!   rank of the access communicator with consistent arguments.
//! - Rank 0 alone materializes the header and table of contents. Every rank
//!   replays the same collective metadata calls, so the in-memory tables of
//!   contents agree without communication; data moves through positional I/O
//!   on each rank's own descriptor.
//! - Visibility across ranks is established at barrier rendezvous. The
//!   reference driver assumes a shared filesystem with read-after-write
//!   consistency on one host; a native parallel driver replaces this crate
//!   behind the same capability surface.

mod file;
mod sink;
mod space;
mod types;

pub use file::{AccessProperties, Container, Dataset, TransferProperties};
pub use sink::SilenceSink;
pub use space::{Dataspace, Selection};
pub use types::{
    ElementType, ScalarType, SlabData, SlabDataMut, conversion_exists, Element,
};

use std::path::PathBuf;

/// Driver-level failure. The engine maps these onto its own outcome codes;
/// the variants exist so callers can tell refusals apart from environment
/// failures without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("container already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("not a container file: {0}")]
    Corrupt(String),
    #[error("no such dataset: {0}")]
    NoSuchDataset(String),
    #[error("dataset already exists: {0}")]
    DuplicateDataset(String),
    #[error("selection mismatch: {0}")]
    Mismatch(String),
    #[error("container is open read-only")]
    ReadOnly,
    #[error("table of contents encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ContainerError>;
