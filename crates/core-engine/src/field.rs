//! Field transfer engine: validation, metadata resolution, layout dispatch.
//!
//! Write resolution:
//! - no metadata yet: create the dataset through the handle's *active*
//!   layout, freeze the metadata tuple, then dispatch the active layout's
//!   writer;
//! - metadata present: the stored extents, component count, and layout tag
//!   govern. Extent or component mismatch is a usage error detected before
//!   any I/O starts; the caller's element type only needs a conversion into
//!   the stored type.
//!
//! Reads are strict: the field must exist and the caller's shape must equal
//! the stored shape. The dispatched layout is always the stored one, so a
//! handle's active tag never affects what a read returns.

use core_container::{conversion_exists, Element, ElementType, SlabData, SlabDataMut};
use core_error::{Error, ErrorCode};
use core_layout::{layout_get, Decomp, SubBlock};

use crate::handle::Handle;
use crate::metadata::{read_metadata, write_metadata};
use crate::Result;

/// Per-direction argument checks shared by the read and write paths. All
/// failures are raised before any container traffic.
fn validate(name: &str, data_len: usize, d: &Decomp) -> Result<()> {
    if name.is_empty() {
        return Err(Error::new(ErrorCode::Fault, "field name must not be empty"));
    }
    if data_len == 0 {
        return Err(Error::new(ErrorCode::Fault, "field buffer must not be empty"));
    }
    if d.components < 1 {
        return Err(Error::new(
            ErrorCode::Invalid,
            "component count must be at least 1",
        ));
    }
    for (label, sb) in [("c", &d.c), ("b", &d.b), ("a", &d.a)] {
        if sb.local < 1 {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!("local count along {label} must be at least 1"),
            ));
        }
        if sb.stride % d.components != 0 {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!(
                    "stride {} along {label} is not a multiple of {} components",
                    sb.stride, d.components
                ),
            ));
        }
    }
    let (cstride, bstride, astride) =
        core_layout::resolve_strides(&d.c, &d.b, &d.a, d.components);
    if astride < d.components
        || bstride < d.a.local * astride
        || cstride < d.b.local * bstride
    {
        return Err(Error::new(
            ErrorCode::Invalid,
            "stride smaller than the sub-block it has to span",
        ));
    }
    let needed = d.c.local * cstride;
    if data_len < needed {
        return Err(Error::new(
            ErrorCode::Invalid,
            format!("buffer holds {data_len} scalars, sub-block footprint is {needed}"),
        ));
    }
    Ok(())
}

fn shape_matches(meta: &crate::FieldMeta, d: &Decomp) -> Result<()> {
    if meta.c != d.c.global || meta.b != d.b.global || meta.a != d.a.global {
        return Err(Error::new(
            ErrorCode::Invalid,
            format!(
                "global extents ({}, {}, {}) do not match stored ({}, {}, {})",
                d.c.global, d.b.global, d.a.global, meta.c, meta.b, meta.a
            ),
        ));
    }
    if meta.components != d.components {
        return Err(Error::new(
            ErrorCode::Invalid,
            format!(
                "component count {} does not match stored {}",
                d.components, meta.components
            ),
        ));
    }
    Ok(())
}

pub(crate) fn write_any(
    handle: &mut Handle,
    name: &str,
    data: SlabData<'_>,
    d: Decomp,
) -> Result<()> {
    validate(name, data.len(), &d)?;
    let scalar = data.scalar_type();
    match read_metadata(handle.container()?, name)? {
        None => {
            let tag = handle.layout();
            let ops = layout_get(tag).ok_or_else(|| {
                Error::new(ErrorCode::Sanity, format!("active layout tag {tag} unregistered"))
            })?;
            let space = (ops.make_filespace)(d.c.global, d.b.global, d.a.global);
            let container = handle.container_mut()?;
            let ds = container
                .dataset_create(name, ElementType::new(scalar, d.components), &space)
                .map_err(crate::failed)?;
            write_metadata(container, name, tag, d.c.global, d.b.global, d.a.global, d.components)?;
            (ops.write)(container, ds, data, &d).map_err(crate::failed)?;
            tracing::debug!(target: "field", name, layout = tag, "field_created");
            Ok(())
        }
        Some(meta) => {
            shape_matches(&meta, &d)?;
            let container = handle.container()?;
            let ds = container.dataset_open(name).ok_or_else(|| {
                Error::new(
                    ErrorCode::Sanity,
                    format!("metadata present but dataset '{name}' missing"),
                )
            })?;
            let stored = container.dataset_type(ds);
            if !conversion_exists(scalar, stored.scalar) {
                return Err(Error::new(
                    ErrorCode::Invalid,
                    format!("no conversion from {scalar:?} into stored {:?}", stored.scalar),
                ));
            }
            let ops = layout_get(meta.layout_tag).ok_or_else(|| {
                Error::new(
                    ErrorCode::Sanity,
                    format!("stored layout tag {} unregistered", meta.layout_tag),
                )
            })?;
            (ops.write)(container, ds, data, &d).map_err(crate::failed)?;
            tracing::debug!(target: "field", name, layout = meta.layout_tag, "field_written");
            Ok(())
        }
    }
}

pub(crate) fn read_any(
    handle: &Handle,
    name: &str,
    data: SlabDataMut<'_>,
    d: Decomp,
) -> Result<()> {
    validate(name, data.len(), &d)?;
    let scalar = data.scalar_type();
    let container = handle.container()?;
    let meta = read_metadata(container, name)?.ok_or_else(|| {
        Error::new(ErrorCode::Failed, format!("no such field '{name}'"))
    })?;
    shape_matches(&meta, &d)?;
    let ds = container.dataset_open(name).ok_or_else(|| {
        Error::new(
            ErrorCode::Sanity,
            format!("metadata present but dataset '{name}' missing"),
        )
    })?;
    let stored = container.dataset_type(ds);
    if !conversion_exists(stored.scalar, scalar) {
        return Err(Error::new(
            ErrorCode::Invalid,
            format!("no conversion from stored {:?} into {scalar:?}", stored.scalar),
        ));
    }
    let ops = layout_get(meta.layout_tag).ok_or_else(|| {
        Error::new(
            ErrorCode::Sanity,
            format!("stored layout tag {} unregistered", meta.layout_tag),
        )
    })?;
    (ops.read)(container, ds, data, &d).map_err(crate::failed)?;
    tracing::debug!(target: "field", name, layout = meta.layout_tag, "field_read");
    Ok(())
}

impl Handle {
    /// Collectively write this rank's sub-block of the scalar 3-D field
    /// `name`. Creates the field under the active layout on first write.
    pub fn field_write<T: Element>(
        &mut self,
        name: &str,
        data: &[T],
        c: SubBlock,
        b: SubBlock,
        a: SubBlock,
    ) -> Result<()> {
        write_any(self, name, T::slab(data), Decomp { c, b, a, components: 1 })
    }

    /// Vector variant of [`Handle::field_write`]: every point carries
    /// `components` scalars and all strides count scalars, so they must be
    /// multiples of `components`.
    pub fn field_writev<T: Element>(
        &mut self,
        name: &str,
        data: &[T],
        c: SubBlock,
        b: SubBlock,
        a: SubBlock,
        components: usize,
    ) -> Result<()> {
        write_any(self, name, T::slab(data), Decomp { c, b, a, components })
    }

    /// Collectively read this rank's sub-block of the scalar 3-D field.
    pub fn field_read<T: Element>(
        &self,
        name: &str,
        data: &mut [T],
        c: SubBlock,
        b: SubBlock,
        a: SubBlock,
    ) -> Result<()> {
        read_any(self, name, T::slab_mut(data), Decomp { c, b, a, components: 1 })
    }

    /// Vector variant of [`Handle::field_read`].
    pub fn field_readv<T: Element>(
        &self,
        name: &str,
        data: &mut [T],
        c: SubBlock,
        b: SubBlock,
        a: SubBlock,
        components: usize,
    ) -> Result<()> {
        read_any(self, name, T::slab_mut(data), Decomp { c, b, a, components })
    }

    /// Stored global extents `(C, B, A)` of a field.
    pub fn field_size(&self, name: &str) -> Result<(usize, usize, usize)> {
        let (c, b, a, _) = self.field_sizev(name)?;
        Ok((c, b, a))
    }

    /// Stored global extents and component count of a field.
    pub fn field_sizev(&self, name: &str) -> Result<(usize, usize, usize, usize)> {
        if name.is_empty() {
            return Err(Error::new(ErrorCode::Fault, "field name must not be empty"));
        }
        let meta = read_metadata(self.container()?, name)?.ok_or_else(|| {
            Error::new(ErrorCode::Failed, format!("no such field '{name}'"))
        })?;
        Ok((meta.c, meta.b, meta.a, meta.components))
    }
}
