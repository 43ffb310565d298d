//! Single-file container driver.
//!
//! On-disk shape:
//!
//! ```text
//! [ 32-byte header ][ data region: datasets, 8-byte aligned ][ TOC (JSON) ]
//! header = magic "ESIOFILE" | format version u32 | pad | toc offset u64 | toc len u64
//! ```
//!
//! The table of contents is rewritten at the current end of the data region
//! on every flush; datasets created afterwards reuse that space and the TOC
//! moves outward again on the next flush. A container is readable by other
//! processes only after a flush or close has landed the TOC.
//!
//! Every rank of a parallel open holds its own descriptor and writes only the
//! byte ranges its selections cover; rank 0 owns the header and TOC. All
//! metadata mutations are collective with identical arguments, so the ranks'
//! in-memory TOCs stay identical without any message traffic.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use core_comm::{Communicator, Hints};

use crate::sink;
use crate::space::{Dataspace, Selection};
use crate::types::{ElementType, ScalarType, SlabData, SlabDataMut};
use crate::{ContainerError, Result};

const MAGIC: &[u8; 8] = b"ESIOFILE";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: u64 = 32;
const DATA_START: u64 = HEADER_LEN;

fn align8(offset: u64) -> u64 {
    offset.next_multiple_of(8)
}

fn header_bytes(toc_offset: u64, toc_len: u64) -> [u8; HEADER_LEN as usize] {
    let mut h = [0u8; HEADER_LEN as usize];
    h[0..8].copy_from_slice(MAGIC);
    h[8..12].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    h[16..24].copy_from_slice(&toc_offset.to_le_bytes());
    h[24..32].copy_from_slice(&toc_len.to_le_bytes());
    h
}

/// Access properties for create/open: the communicator the container is
/// collective over (absent = process-local) and the opaque hint bag.
#[derive(Default, Clone)]
pub struct AccessProperties {
    pub comm: Option<Arc<dyn Communicator>>,
    pub hints: Hints,
}

impl AccessProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comm(mut self, comm: Arc<dyn Communicator>) -> Self {
        self.comm = Some(comm);
        self
    }

    pub fn with_hints(mut self, hints: Hints) -> Self {
        self.hints = hints;
        self
    }
}

/// Transfer properties: collective transfers rendezvous the whole group on
/// entry and exit so cross-rank visibility is established; independent
/// transfers touch only this rank's descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProperties {
    pub collective: bool,
}

impl TransferProperties {
    pub fn collective() -> Self {
        Self { collective: true }
    }

    pub fn independent() -> Self {
        Self::default()
    }
}

/// Handle to a dataset inside an open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset(usize);

#[derive(Debug, Serialize, Deserialize)]
struct DatasetEntry {
    name: String,
    elem: ElementType,
    dims: Vec<usize>,
    offset: u64,
}

#[derive(Debug, Serialize, Deserialize)]
enum AttributeValue {
    Ints(Vec<u32>),
    Numeric { scalar: ScalarType, values: Vec<f64> },
    Text(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct AttributeEntry {
    object: String,
    name: String,
    value: AttributeValue,
}

#[derive(Debug, Serialize, Deserialize)]
struct Toc {
    datasets: Vec<DatasetEntry>,
    attributes: Vec<AttributeEntry>,
    next_offset: u64,
}

impl Toc {
    fn fresh() -> Self {
        Self {
            datasets: Vec::new(),
            attributes: Vec::new(),
            next_offset: DATA_START,
        }
    }
}

/// An open container file.
pub struct Container {
    file: File,
    path: PathBuf,
    readwrite: bool,
    comm: Option<Arc<dyn Communicator>>,
    toc: Toc,
    closed: bool,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("file", &self.file)
            .field("path", &self.path)
            .field("readwrite", &self.readwrite)
            .field("comm", &self.comm.as_ref().map(|_| "<communicator>"))
            .field("toc", &self.toc)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Container {
    /// Collectively create a container at `path`. With `overwrite = false`
    /// an existing file is a refusal, checked identically on every rank
    /// before anything touches the filesystem.
    pub fn create(path: impl AsRef<Path>, overwrite: bool, props: &AccessProperties) -> Result<Self> {
        Self::create_inner(path.as_ref(), overwrite, props).inspect_err(sink::report)
    }

    fn create_inner(path: &Path, overwrite: bool, props: &AccessProperties) -> Result<Self> {
        if !overwrite && path.exists() {
            return Err(ContainerError::AlreadyExists(path.to_path_buf()));
        }
        let comm = props.comm.clone();
        let rank = comm.as_ref().map_or(0, |c| c.rank());
        let file = if rank == 0 {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            file.write_all_at(&header_bytes(DATA_START, 0), 0)?;
            file.sync_all()?;
            if let Some(c) = &comm {
                c.barrier();
            }
            file
        } else {
            if let Some(c) = &comm {
                c.barrier();
            }
            OpenOptions::new().read(true).write(true).open(path)?
        };
        tracing::debug!(
            target: "container",
            path = %path.display(),
            hints = props.hints.len(),
            "container_created"
        );
        Ok(Self {
            file,
            path: path.to_path_buf(),
            readwrite: true,
            comm,
            toc: Toc::fresh(),
            closed: false,
        })
    }

    /// Collectively open an existing container. Every rank parses the header
    /// and TOC independently; they are immutable between collective calls.
    pub fn open(path: impl AsRef<Path>, readwrite: bool, props: &AccessProperties) -> Result<Self> {
        Self::open_inner(path.as_ref(), readwrite, props).inspect_err(sink::report)
    }

    fn open_inner(path: &Path, readwrite: bool, props: &AccessProperties) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(readwrite).open(path)?;
        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact_at(&mut header, 0)
            .map_err(|_| ContainerError::Corrupt("short header".into()))?;
        if &header[0..8] != MAGIC {
            return Err(ContainerError::Corrupt("bad magic".into()));
        }
        let version = u32::from_le_bytes(header[8..12].try_into().unwrap());
        if version != FORMAT_VERSION {
            return Err(ContainerError::Corrupt(format!(
                "unsupported format version {version}"
            )));
        }
        let toc_offset = u64::from_le_bytes(header[16..24].try_into().unwrap());
        let toc_len = u64::from_le_bytes(header[24..32].try_into().unwrap());
        let toc = if toc_len == 0 {
            Toc::fresh()
        } else {
            let mut buf = vec![0u8; toc_len as usize];
            file.read_exact_at(&mut buf, toc_offset)
                .map_err(|_| ContainerError::Corrupt("short table of contents".into()))?;
            serde_json::from_slice(&buf)
                .map_err(|e| ContainerError::Corrupt(format!("table of contents: {e}")))?
        };
        tracing::debug!(
            target: "container",
            path = %path.display(),
            readwrite,
            datasets = toc.datasets.len(),
            hints = props.hints.len(),
            "container_opened"
        );
        Ok(Self {
            file,
            path: path.to_path_buf(),
            readwrite,
            comm: props.comm.clone(),
            toc,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn readwrite(&self) -> bool {
        self.readwrite
    }

    fn rank(&self) -> usize {
        self.comm.as_ref().map_or(0, |c| c.rank())
    }

    fn barrier(&self) {
        if let Some(c) = &self.comm {
            c.barrier();
        }
    }

    /// Collective flush: land this rank's data, then let rank 0 persist the
    /// TOC and header. After the closing rendezvous the file is readable by
    /// an independent open.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_collective().inspect_err(sink::report)
    }

    fn flush_collective(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.barrier();
        let result = if self.rank() == 0 && self.readwrite {
            self.write_toc()
        } else {
            Ok(())
        };
        self.barrier();
        result?;
        tracing::debug!(target: "container", path = %self.path.display(), "container_flushed");
        Ok(())
    }

    fn write_toc(&mut self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.toc)?;
        self.file.write_all_at(&bytes, self.toc.next_offset)?;
        self.file
            .write_all_at(&header_bytes(self.toc.next_offset, bytes.len() as u64), 0)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Collective close. Flushes, then releases the descriptor.
    pub fn close(mut self) -> Result<()> {
        let result = self.flush();
        self.closed = true;
        result?;
        tracing::debug!(target: "container", path = %self.path.display(), "container_closed");
        Ok(())
    }

    /// Collectively create a dataset of `elem` elements over `space`. The
    /// extent is materialized immediately so unwritten regions read as zero.
    pub fn dataset_create(
        &mut self,
        name: &str,
        elem: ElementType,
        space: &Dataspace,
    ) -> Result<Dataset> {
        self.dataset_create_inner(name, elem, space)
            .inspect_err(sink::report)
    }

    fn dataset_create_inner(
        &mut self,
        name: &str,
        elem: ElementType,
        space: &Dataspace,
    ) -> Result<Dataset> {
        if !self.readwrite {
            return Err(ContainerError::ReadOnly);
        }
        if self.toc.datasets.iter().any(|d| d.name == name) {
            return Err(ContainerError::DuplicateDataset(name.to_string()));
        }
        let offset = align8(self.toc.next_offset);
        let end = offset + (space.element_count() * elem.byte_size()) as u64;
        if self.rank() == 0 {
            self.file.set_len(end)?;
        }
        self.toc.datasets.push(DatasetEntry {
            name: name.to_string(),
            elem,
            dims: space.dims().to_vec(),
            offset,
        });
        self.toc.next_offset = end;
        tracing::debug!(
            target: "container",
            name,
            dims = ?space.dims(),
            components = elem.components,
            "dataset_created"
        );
        Ok(Dataset(self.toc.datasets.len() - 1))
    }

    /// Probe for a dataset by name. Absence is not an error and reaches no
    /// error sink.
    pub fn dataset_open(&self, name: &str) -> Option<Dataset> {
        self.toc
            .datasets
            .iter()
            .position(|d| d.name == name)
            .map(Dataset)
    }

    pub fn dataset_type(&self, ds: Dataset) -> ElementType {
        self.toc.datasets[ds.0].elem
    }

    pub fn dataset_dims(&self, ds: Dataset) -> &[usize] {
        &self.toc.datasets[ds.0].dims
    }

    fn put_attribute(&mut self, object: &str, name: &str, value: AttributeValue) -> Result<()> {
        if !self.readwrite {
            return Err(ContainerError::ReadOnly);
        }
        match self
            .toc
            .attributes
            .iter_mut()
            .find(|e| e.object == object && e.name == name)
        {
            Some(entry) => entry.value = value,
            None => self.toc.attributes.push(AttributeEntry {
                object: object.to_string(),
                name: name.to_string(),
                value,
            }),
        }
        Ok(())
    }

    fn find_attribute(&self, object: &str, name: &str) -> Option<&AttributeValue> {
        self.toc
            .attributes
            .iter()
            .find(|e| e.object == object && e.name == name)
            .map(|e| &e.value)
    }

    /// Set an integer-vector attribute on a named object (collective).
    pub fn attribute_write_ints(&mut self, object: &str, name: &str, values: &[u32]) -> Result<()> {
        self.put_attribute(object, name, AttributeValue::Ints(values.to_vec()))
            .inspect_err(sink::report)
    }

    /// Fill `out` from an integer-vector attribute, returning the stored
    /// length (which may exceed `out.len()`; only `out.len()` values are
    /// copied). `None` when the attribute is absent.
    pub fn attribute_read_ints_into(&self, object: &str, name: &str, out: &mut [u32]) -> Option<usize> {
        match self.find_attribute(object, name)? {
            AttributeValue::Ints(values) => {
                let n = values.len().min(out.len());
                out[..n].copy_from_slice(&values[..n]);
                Some(values.len())
            }
            _ => None,
        }
    }

    /// Set a numeric-vector attribute; values travel widened to `f64`, the
    /// declared scalar type is preserved for readers.
    pub fn attribute_write_numeric(
        &mut self,
        object: &str,
        name: &str,
        scalar: ScalarType,
        values: &[f64],
    ) -> Result<()> {
        self.put_attribute(
            object,
            name,
            AttributeValue::Numeric {
                scalar,
                values: values.to_vec(),
            },
        )
        .inspect_err(sink::report)
    }

    pub fn attribute_read_numeric(&self, object: &str, name: &str) -> Option<(ScalarType, Vec<f64>)> {
        match self.find_attribute(object, name)? {
            AttributeValue::Numeric { scalar, values } => Some((*scalar, values.clone())),
            _ => None,
        }
    }

    pub fn attribute_write_text(&mut self, object: &str, name: &str, value: &str) -> Result<()> {
        self.put_attribute(object, name, AttributeValue::Text(value.to_string()))
            .inspect_err(sink::report)
    }

    pub fn attribute_read_text(&self, object: &str, name: &str) -> Option<String> {
        match self.find_attribute(object, name)? {
            AttributeValue::Text(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Stored component count of an attribute, `None` when absent.
    pub fn attribute_len(&self, object: &str, name: &str) -> Option<usize> {
        Some(match self.find_attribute(object, name)? {
            AttributeValue::Ints(v) => v.len(),
            AttributeValue::Numeric { values, .. } => values.len(),
            AttributeValue::Text(v) => v.len(),
        })
    }

    fn check_transfer(
        &self,
        ds: Dataset,
        data_len: usize,
        mem: &Selection,
        file_sel: &Selection,
    ) -> Result<()> {
        let entry = &self.toc.datasets[ds.0];
        if file_sel.dims() != entry.dims.as_slice() {
            return Err(ContainerError::Mismatch(format!(
                "file selection extent {:?} against dataset extent {:?}",
                file_sel.dims(),
                entry.dims
            )));
        }
        let selected = mem.element_count();
        if selected != file_sel.element_count() {
            return Err(ContainerError::Mismatch(format!(
                "memory selects {selected} elements, file selects {}",
                file_sel.element_count()
            )));
        }
        let mem_space: usize = mem.dims().iter().product();
        if data_len < mem_space * entry.elem.components {
            return Err(ContainerError::Mismatch(format!(
                "buffer holds {data_len} scalars, memory dataspace needs {}",
                mem_space * entry.elem.components
            )));
        }
        Ok(())
    }

    /// Transfer from a memory selection of `data` into a file selection of
    /// the dataset, converting scalars to the stored type.
    pub fn write_dataset(
        &self,
        ds: Dataset,
        data: SlabData<'_>,
        mem: &Selection,
        file_sel: &Selection,
        xfer: &TransferProperties,
    ) -> Result<()> {
        if xfer.collective {
            self.barrier();
        }
        let result = self
            .write_inner(ds, data, mem, file_sel)
            .inspect_err(sink::report);
        if xfer.collective {
            self.barrier();
        }
        result
    }

    fn write_inner(
        &self,
        ds: Dataset,
        data: SlabData<'_>,
        mem: &Selection,
        file_sel: &Selection,
    ) -> Result<()> {
        if !self.readwrite {
            return Err(ContainerError::ReadOnly);
        }
        self.check_transfer(ds, data.len(), mem, file_sel)?;
        let entry = &self.toc.datasets[ds.0];
        let ncomp = entry.elem.components;
        let scalar = entry.elem.scalar;
        let esize = entry.elem.byte_size();

        let mem_spans = mem.spans();
        let file_spans = file_sel.spans();
        let mut buf: Vec<u8> = Vec::new();
        let (mut mi, mut moff) = (0usize, 0usize);
        for &(fstart, flen) in &file_spans {
            let mut fdone = 0usize;
            while fdone < flen {
                let (mstart, mlen) = mem_spans[mi];
                let take = (flen - fdone).min(mlen - moff);
                let mem_scalar = (mstart + moff) * ncomp;
                let file_el = fstart + fdone;
                buf.clear();
                for s in 0..take * ncomp {
                    push_scalar(&mut buf, scalar, data.get_f64(mem_scalar + s));
                }
                self.file
                    .write_all_at(&buf, entry.offset + (file_el * esize) as u64)?;
                fdone += take;
                moff += take;
                if moff == mlen {
                    mi += 1;
                    moff = 0;
                }
            }
        }
        Ok(())
    }

    /// Transfer from a file selection of the dataset into a memory selection
    /// of `data`, converting stored scalars to the caller's type.
    pub fn read_dataset(
        &self,
        ds: Dataset,
        mut data: SlabDataMut<'_>,
        mem: &Selection,
        file_sel: &Selection,
        xfer: &TransferProperties,
    ) -> Result<()> {
        if xfer.collective {
            self.barrier();
        }
        let result = self
            .read_inner(ds, &mut data, mem, file_sel)
            .inspect_err(sink::report);
        if xfer.collective {
            self.barrier();
        }
        result
    }

    fn read_inner(
        &self,
        ds: Dataset,
        data: &mut SlabDataMut<'_>,
        mem: &Selection,
        file_sel: &Selection,
    ) -> Result<()> {
        self.check_transfer(ds, data.len(), mem, file_sel)?;
        let entry = &self.toc.datasets[ds.0];
        let ncomp = entry.elem.components;
        let scalar = entry.elem.scalar;
        let ssize = scalar.byte_size();
        let esize = entry.elem.byte_size();

        let mem_spans = mem.spans();
        let file_spans = file_sel.spans();
        let mut buf: Vec<u8> = Vec::new();
        let (mut mi, mut moff) = (0usize, 0usize);
        for &(fstart, flen) in &file_spans {
            let mut fdone = 0usize;
            while fdone < flen {
                let (mstart, mlen) = mem_spans[mi];
                let take = (flen - fdone).min(mlen - moff);
                let mem_scalar = (mstart + moff) * ncomp;
                let file_el = fstart + fdone;
                buf.resize(take * esize, 0);
                self.file
                    .read_exact_at(&mut buf, entry.offset + (file_el * esize) as u64)?;
                for s in 0..take * ncomp {
                    let v = pull_scalar(&buf[s * ssize..(s + 1) * ssize], scalar);
                    data.set_f64(mem_scalar + s, v);
                }
                fdone += take;
                moff += take;
                if moff == mlen {
                    mi += 1;
                    moff = 0;
                }
            }
        }
        Ok(())
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Force-close path: no rendezvous, best effort, errors discarded.
        if self.readwrite && self.rank() == 0 {
            let _ = self.write_toc();
        }
        let _ = self.file.sync_data();
    }
}

fn push_scalar(buf: &mut Vec<u8>, scalar: ScalarType, v: f64) {
    match scalar {
        ScalarType::F64 => buf.extend_from_slice(&v.to_le_bytes()),
        ScalarType::F32 => buf.extend_from_slice(&(v as f32).to_le_bytes()),
        ScalarType::I32 => buf.extend_from_slice(&(v as i32).to_le_bytes()),
    }
}

fn pull_scalar(bytes: &[u8], scalar: ScalarType) -> f64 {
    match scalar {
        ScalarType::F64 => f64::from_le_bytes(bytes.try_into().unwrap()),
        ScalarType::F32 => f64::from(f32::from_le_bytes(bytes.try_into().unwrap())),
        ScalarType::I32 => f64::from(i32::from_le_bytes(bytes.try_into().unwrap())),
    }
}
