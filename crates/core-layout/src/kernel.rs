//! Per-layout transfer kernels.
//!
//! Every kernel honors the same contract: build the memory selection as a
//! 1-D union of strided runs enumerating the local sub-block in `(C, B, A)`
//! scan order, build the layout's file selection for the same element count,
//! and hand both to a collective container transfer. All selection and
//! property objects are owned values, released on every exit path.

use core_container::{
    Container, Dataset, Dataspace, Selection, SlabData, SlabDataMut, TransferProperties,
};

use crate::Decomp;
use crate::SubBlock;

/// Effective per-direction strides in scalars, with zeros replaced by the
/// tight products: `astride = components`, `bstride = alocal * astride`,
/// `cstride = blocal * bstride`.
pub fn resolve_strides(c: &SubBlock, b: &SubBlock, a: &SubBlock, components: usize) -> (usize, usize, usize) {
    let astride = if a.stride == 0 { components } else { a.stride };
    let bstride = if b.stride == 0 { a.local * astride } else { b.stride };
    let cstride = if c.stride == 0 { b.local * bstride } else { c.stride };
    (cstride, bstride, astride)
}

/// Memory-side selection: the caller's buffer viewed as a 1-D space of
/// whole elements, with one strided run OR'd in per `(k, j)` pair.
fn memory_selection(d: &Decomp) -> core_container::Result<Selection> {
    let ncomp = d.components;
    let (cstride, bstride, astride) = resolve_strides(&d.c, &d.b, &d.a, ncomp);
    let len = d.c.local * cstride / ncomp;
    let mut sel = Selection::none(&[len]);
    for k in 0..d.c.local {
        for j in 0..d.b.local {
            let base = (k * cstride + j * bstride) / ncomp;
            sel.select(&[base], &[astride / ncomp], &[d.a.local])?;
        }
    }
    Ok(sel)
}

// ---- tag 0: contiguous (C, B, A) ------------------------------------------

pub(crate) fn filespace_contiguous(c: usize, b: usize, a: usize) -> Dataspace {
    Dataspace::new(&[c, b, a])
}

fn file_selection_contiguous(d: &Decomp) -> core_container::Result<Selection> {
    Selection::hyperslab(
        &[d.c.global, d.b.global, d.a.global],
        &[d.c.start, d.b.start, d.a.start],
        &[d.c.local, d.b.local, d.a.local],
    )
}

pub(crate) fn write_contiguous(
    container: &Container,
    ds: Dataset,
    data: SlabData<'_>,
    d: &Decomp,
) -> core_container::Result<()> {
    let mem = memory_selection(d)?;
    let file_sel = file_selection_contiguous(d)?;
    container.write_dataset(ds, data, &mem, &file_sel, &TransferProperties::collective())
}

pub(crate) fn read_contiguous(
    container: &Container,
    ds: Dataset,
    data: SlabDataMut<'_>,
    d: &Decomp,
) -> core_container::Result<()> {
    let mem = memory_selection(d)?;
    let file_sel = file_selection_contiguous(d)?;
    container.read_dataset(ds, data, &mem, &file_sel, &TransferProperties::collective())
}

// ---- tag 1: plane-grouped (C, B·A) ----------------------------------------

pub(crate) fn filespace_planes(c: usize, b: usize, a: usize) -> Dataspace {
    Dataspace::new(&[c, b * a])
}

fn file_selection_planes(d: &Decomp) -> core_container::Result<Selection> {
    let dims = [d.c.global, d.b.global * d.a.global];
    let mut sel = Selection::none(&dims);
    for j in 0..d.b.local {
        sel.select(
            &[d.c.start, (d.b.start + j) * d.a.global + d.a.start],
            &[1, 1],
            &[d.c.local, d.a.local],
        )?;
    }
    Ok(sel)
}

pub(crate) fn write_planes(
    container: &Container,
    ds: Dataset,
    data: SlabData<'_>,
    d: &Decomp,
) -> core_container::Result<()> {
    let mem = memory_selection(d)?;
    let file_sel = file_selection_planes(d)?;
    container.write_dataset(ds, data, &mem, &file_sel, &TransferProperties::collective())
}

pub(crate) fn read_planes(
    container: &Container,
    ds: Dataset,
    data: SlabDataMut<'_>,
    d: &Decomp,
) -> core_container::Result<()> {
    let mem = memory_selection(d)?;
    let file_sel = file_selection_planes(d)?;
    container.read_dataset(ds, data, &mem, &file_sel, &TransferProperties::collective())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_container::{AccessProperties, Element, ElementType, ScalarType};

    fn decomp(c: SubBlock, b: SubBlock, a: SubBlock, components: usize) -> Decomp {
        Decomp {
            c,
            b,
            a,
            components,
        }
    }

    #[test]
    fn tight_strides_resolve_from_zero() {
        let c = SubBlock::new(4, 0, 4, 0);
        let b = SubBlock::new(3, 0, 3, 0);
        let a = SubBlock::new(2, 0, 2, 0);
        assert_eq!(resolve_strides(&c, &b, &a, 1), (6, 2, 1));
        assert_eq!(resolve_strides(&c, &b, &a, 2), (12, 4, 2));
    }

    #[test]
    fn explicit_strides_pass_through() {
        let c = SubBlock::new(4, 0, 2, 40);
        let b = SubBlock::new(3, 0, 3, 10);
        let a = SubBlock::new(2, 0, 2, 3);
        assert_eq!(resolve_strides(&c, &b, &a, 1), (40, 10, 3));
    }

    #[test]
    fn memory_selection_is_the_scan_ordered_sub_block() {
        // 2x2x2 local block padded along A: stride 3 scalars between
        // A-neighbors' runs is expressed per (k, j) run.
        let d = decomp(
            SubBlock::new(2, 0, 2, 12),
            SubBlock::new(2, 0, 2, 6),
            SubBlock::new(2, 0, 2, 3),
            1,
        );
        let sel = memory_selection(&d).unwrap();
        assert_eq!(sel.element_count(), 8);
        // Runs land at k*12 + j*6 + {0, 3}.
        let expected: Vec<usize> = vec![0, 3, 6, 9, 12, 15, 18, 21];
        let mut seen = Vec::new();
        let mut probe = vec![0.0f64; 24];
        for (i, slot) in probe.iter_mut().enumerate() {
            *slot = i as f64;
        }
        // The selection itself is opaque; verify through a scatter/gather.
        let dir = tempfile::tempdir().unwrap();
        let props = AccessProperties::new();
        let mut cont =
            Container::create(dir.path().join("probe.bin"), true, &props).unwrap();
        let ds = cont
            .dataset_create("p", ElementType::scalar_of(ScalarType::F64), &Dataspace::new(&[8]))
            .unwrap();
        let file_sel = Selection::hyperslab(&[8], &[0], &[8]).unwrap();
        cont.write_dataset(
            ds,
            f64::slab(&probe),
            &sel,
            &file_sel,
            &TransferProperties::independent(),
        )
        .unwrap();
        let mut packed = vec![0.0f64; 8];
        let mem_all = Selection::hyperslab(&[8], &[0], &[8]).unwrap();
        cont.read_dataset(
            ds,
            f64::slab_mut(&mut packed),
            &mem_all,
            &file_sel,
            &TransferProperties::independent(),
        )
        .unwrap();
        for v in packed {
            seen.push(v as usize);
        }
        assert_eq!(seen, expected);
    }

    #[test]
    fn plane_grouped_roundtrip_matches_contiguous() {
        // One rank owning the whole 3x2x2 field: writing through tag 1 and
        // reading through tag 1 must reproduce the buffer, and the 2-D
        // dataset must hold C-plane rows.
        let dir = tempfile::tempdir().unwrap();
        let props = AccessProperties::new();
        let mut cont = Container::create(dir.path().join("planes.bin"), true, &props).unwrap();
        let d = decomp(
            SubBlock::new(3, 0, 3, 0),
            SubBlock::new(2, 0, 2, 0),
            SubBlock::new(2, 0, 2, 0),
            1,
        );
        let space = filespace_planes(3, 2, 2);
        assert_eq!(space.dims(), &[3, 4]);
        let ds = cont
            .dataset_create("f", ElementType::scalar_of(ScalarType::F64), &space)
            .unwrap();
        let data: Vec<f64> = (0..12).map(f64::from).collect();
        write_planes(&cont, ds, f64::slab(&data), &d).unwrap();

        let mut out = vec![0.0f64; 12];
        read_planes(&cont, ds, f64::slab_mut(&mut out), &d).unwrap();
        assert_eq!(out, data);

        // Row 1 of the 2-D arrangement is the second C-plane.
        let mut row = vec![0.0f64; 4];
        let mem = Selection::hyperslab(&[4], &[0], &[4]).unwrap();
        let file_sel = Selection::hyperslab(&[3, 4], &[1, 0], &[1, 4]).unwrap();
        cont.read_dataset(
            ds,
            f64::slab_mut(&mut row),
            &mem,
            &file_sel,
            &TransferProperties::independent(),
        )
        .unwrap();
        assert_eq!(row, vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn partial_sub_block_through_plane_layout() {
        // Rank owns B rows 1..2 of a 2x3x2 field; the plane layout scatters
        // them into non-adjacent column blocks.
        let dir = tempfile::tempdir().unwrap();
        let props = AccessProperties::new();
        let mut cont = Container::create(dir.path().join("part.bin"), true, &props).unwrap();
        let space = filespace_planes(2, 3, 2);
        let ds = cont
            .dataset_create("g", ElementType::scalar_of(ScalarType::F64), &space)
            .unwrap();
        let d = decomp(
            SubBlock::new(2, 0, 2, 0),
            SubBlock::new(3, 1, 1, 0),
            SubBlock::new(2, 0, 2, 0),
            1,
        );
        let data = [10.0f64, 11.0, 12.0, 13.0];
        write_planes(&cont, ds, f64::slab(&data), &d).unwrap();

        // Whole-row gather of the 2-D dataset: row k holds the flattened
        // (B, A) plane, so columns 2..4 carry this rank's contribution.
        let mut whole = vec![0.0f64; 12];
        let mem = Selection::hyperslab(&[12], &[0], &[12]).unwrap();
        let file_sel = Selection::hyperslab(&[2, 6], &[0, 0], &[2, 6]).unwrap();
        cont.read_dataset(
            ds,
            f64::slab_mut(&mut whole),
            &mem,
            &file_sel,
            &TransferProperties::independent(),
        )
        .unwrap();
        assert_eq!(whole[2..4], [10.0, 11.0]);
        assert_eq!(whole[8..10], [12.0, 13.0]);
        assert_eq!(whole[0..2], [0.0, 0.0]);
    }
}
