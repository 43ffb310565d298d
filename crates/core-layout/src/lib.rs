//! Closed registry of on-disk field layouts.
//!
//! A layout decides how a 3-D field `(C, B, A)` is arranged inside the
//! container and how a rank's local sub-block moves to and from that
//! arrangement. Each registry entry supplies three function-typed members:
//! the filespace constructor, the slab writer, and the slab reader. The
//! engine dispatches through the entry whose tag is *stored* in a field's
//! metadata (the handle's active tag only governs creation), so a file
//! written under any registered layout reads back under any handle.
//!
//! The registry is a `static` table, read-only from program start, with tags
//! equal to table positions:
//!
//! - tag 0: one contiguous 3-D dataset in natural `(C, B, A)` order;
//! - tag 1: plane-grouped 2-D arrangement `(C, B·A)`, rows are C-planes.

mod kernel;

use core_container::{Container, Dataset, Dataspace, SlabData, SlabDataMut};

pub use kernel::resolve_strides;

/// One direction of a rank's local sub-block: global extent, zero-based
/// start, local count, and the in-memory spacing (in scalars) between
/// adjacent positions. A zero stride means contiguous: the tight product of
/// the faster directions' locals and the component count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubBlock {
    pub global: usize,
    pub start: usize,
    pub local: usize,
    pub stride: usize,
}

impl SubBlock {
    pub const fn new(global: usize, start: usize, local: usize, stride: usize) -> Self {
        Self {
            global,
            start,
            local,
            stride,
        }
    }

    /// A direction held at extent 1, used by the lower-rank reductions.
    pub const fn held() -> Self {
        Self::new(1, 0, 1, 0)
    }
}

/// A full three-direction decomposition plus component count, as handed to a
/// layout kernel.
#[derive(Debug, Clone, Copy)]
pub struct Decomp {
    pub c: SubBlock,
    pub b: SubBlock,
    pub a: SubBlock,
    pub components: usize,
}

pub type MakeFilespaceFn = fn(usize, usize, usize) -> Dataspace;
pub type WriteFn =
    fn(&Container, Dataset, SlabData<'_>, &Decomp) -> core_container::Result<()>;
pub type ReadFn =
    fn(&Container, Dataset, SlabDataMut<'_>, &Decomp) -> core_container::Result<()>;

/// Registry entry. Plain function pointers; the table is the whole dispatch
/// mechanism.
pub struct LayoutOps {
    pub tag: u32,
    pub make_filespace: MakeFilespaceFn,
    pub write: WriteFn,
    pub read: ReadFn,
}

static LAYOUTS: [LayoutOps; 2] = [
    LayoutOps {
        tag: 0,
        make_filespace: kernel::filespace_contiguous,
        write: kernel::write_contiguous,
        read: kernel::read_contiguous,
    },
    LayoutOps {
        tag: 1,
        make_filespace: kernel::filespace_planes,
        write: kernel::write_planes,
        read: kernel::read_planes,
    },
];

/// Number of registered layouts.
pub fn layout_count() -> usize {
    LAYOUTS.len()
}

/// Registry entry for `tag`, `None` when the tag is outside the table.
pub fn layout_get(tag: usize) -> Option<&'static LayoutOps> {
    LAYOUTS.get(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_table_positions() {
        assert!(layout_count() >= 1, "the baseline layout must exist");
        for (i, ops) in LAYOUTS.iter().enumerate() {
            assert_eq!(ops.tag as usize, i);
        }
    }

    #[test]
    fn lookup_past_the_table_is_none() {
        assert!(layout_get(layout_count()).is_none());
        assert!(layout_get(0).is_some());
    }

    #[test]
    fn filespaces_have_expected_shapes() {
        let ops0 = layout_get(0).unwrap();
        assert_eq!((ops0.make_filespace)(4, 3, 2).dims(), &[4, 3, 2]);
        let ops1 = layout_get(1).unwrap();
        assert_eq!((ops1.make_filespace)(4, 3, 2).dims(), &[4, 6]);
    }
}
