//! Field metadata codec.
//!
//! Every field carries an 8-integer attribute
//! `{ver_major, ver_minor, ver_patch, layout_tag, C, B, A, components}`
//! named `esio_metadata`. The tuple, not the caller, is authoritative for
//! shape and layout; it is re-probed from storage on every field operation.
//!
//! Probing doubles as the existence test, so it must stay silent: both the
//! engine's hook and the driver's sink are suppressed for the duration of
//! the read and restored on every exit path. Format drift is caught with a
//! sentinel one slot past the tuple: a driver reporting a different length
//! or touching the sentinel slot is a broken contract, not a user error.

use core_container::{Container, SilenceSink};
use core_error::{Error, ErrorCode, SilenceErrors};

use crate::Result;

/// Attribute name attached to every field dataset.
pub const METADATA_NAME: &str = "esio_metadata";

const TUPLE_LEN: usize = 8;
const SENTINEL: u32 = 0x5a5a_5a5a;

/// Library version triple frozen into the metadata tuple.
const VERSION: (u32, u32, u32) = (0, 1, 0);

/// Decoded field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    pub layout_tag: usize,
    pub c: usize,
    pub b: usize,
    pub a: usize,
    pub components: usize,
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::new(
            ErrorCode::Invalid,
            format!("{what} {value} exceeds the metadata integer range"),
        )
    })
}

/// Attach the metadata tuple to `name`. Layout decisions freeze here: the
/// tuple is written once, at first write.
pub(crate) fn write_metadata(
    container: &mut Container,
    name: &str,
    layout_tag: usize,
    c: usize,
    b: usize,
    a: usize,
    components: usize,
) -> Result<()> {
    let tuple = [
        VERSION.0,
        VERSION.1,
        VERSION.2,
        to_u32(layout_tag, "layout tag")?,
        to_u32(c, "global extent")?,
        to_u32(b, "global extent")?,
        to_u32(a, "global extent")?,
        to_u32(components, "component count")?,
    ];
    container
        .attribute_write_ints(name, METADATA_NAME, &tuple)
        .map_err(crate::failed)?;
    tracing::debug!(target: "metadata", name, layout_tag, c, b, a, components, "metadata_written");
    Ok(())
}

/// Probe the metadata tuple of `name`. `Ok(None)` means the field does not
/// exist; no error sink hears about it.
pub(crate) fn read_metadata(container: &Container, name: &str) -> Result<Option<FieldMeta>> {
    let mut tuple = [0u32; TUPLE_LEN + 1];
    tuple[TUPLE_LEN] = SENTINEL;
    let stored = {
        let _quiet_hook = SilenceErrors::new();
        let _quiet_sink = SilenceSink::new();
        container.attribute_read_ints_into(name, METADATA_NAME, &mut tuple)
    };
    let Some(stored) = stored else {
        return Ok(None);
    };
    if stored != TUPLE_LEN || tuple[TUPLE_LEN] != SENTINEL {
        return Err(Error::new(
            ErrorCode::Sanity,
            format!("metadata tuple for '{name}' has drifted (stored length {stored})"),
        ));
    }
    let layout_tag = tuple[3] as usize;
    if layout_tag >= core_layout::layout_count() {
        return Err(Error::new(
            ErrorCode::Sanity,
            format!("stored layout tag {layout_tag} outside registry of {}", core_layout::layout_count()),
        ));
    }
    Ok(Some(FieldMeta {
        layout_tag,
        c: tuple[4] as usize,
        b: tuple[5] as usize,
        a: tuple[6] as usize,
        components: tuple[7] as usize,
    }))
}
