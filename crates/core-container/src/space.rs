//! Dataspaces and hyperslab selections.
//!
//! A `Selection` is a union of strided hyperslabs over an n-D extent. Unions
//! are enumerated in canonical order, strictly increasing linear element
//! offset, regardless of the order slabs were OR'd in. That is the pairing
//! contract collective transfers rely on: the k-th selected element on the
//! memory side moves to/from the k-th selected element on the file side.
//! Slabs of one selection must be disjoint; an overlapping union would pair
//! elements twice and is rejected indirectly by the transfer count check.

use serde::{Deserialize, Serialize};

use crate::ContainerError;

/// Simple n-D extent, row-major, fastest direction last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataspace {
    dims: Vec<usize>,
}

impl Dataspace {
    pub fn new(dims: &[usize]) -> Self {
        assert!(!dims.is_empty(), "a dataspace needs at least one dimension");
        Self {
            dims: dims.to_vec(),
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }
}

#[derive(Debug, Clone)]
struct Hyperslab {
    start: Vec<usize>,
    stride: Vec<usize>,
    count: Vec<usize>,
}

/// Union of strided hyperslabs over one extent.
#[derive(Debug, Clone)]
pub struct Selection {
    dims: Vec<usize>,
    slabs: Vec<Hyperslab>,
}

impl Selection {
    /// Empty selection over `dims`. A rank contributing no data to a
    /// collective transfer still participates with one of these.
    pub fn none(dims: &[usize]) -> Self {
        assert!(!dims.is_empty(), "a selection needs at least one dimension");
        Self {
            dims: dims.to_vec(),
            slabs: Vec::new(),
        }
    }

    /// Contiguous block selection: `count` elements starting at `start`.
    pub fn hyperslab(dims: &[usize], start: &[usize], count: &[usize]) -> crate::Result<Self> {
        let mut sel = Self::none(dims);
        let stride = vec![1; dims.len()];
        sel.select(start, &stride, count)?;
        Ok(sel)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// OR a strided hyperslab into the union: along direction `d` it covers
    /// `count[d]` elements spaced `stride[d]` apart from `start[d]`.
    pub fn select(&mut self, start: &[usize], stride: &[usize], count: &[usize]) -> crate::Result<()> {
        let rank = self.dims.len();
        if start.len() != rank || stride.len() != rank || count.len() != rank {
            return Err(ContainerError::Mismatch(format!(
                "selection rank {} against dataspace rank {rank}",
                start.len()
            )));
        }
        for d in 0..rank {
            if count[d] == 0 {
                continue;
            }
            if stride[d] == 0 && count[d] > 1 {
                return Err(ContainerError::Mismatch(format!(
                    "zero stride with count {} along direction {d}",
                    count[d]
                )));
            }
            let last = start[d] + (count[d] - 1) * stride[d];
            if last >= self.dims[d] {
                return Err(ContainerError::Mismatch(format!(
                    "selection reaches {last} along direction {d}, extent {}",
                    self.dims[d]
                )));
            }
        }
        self.slabs.push(Hyperslab {
            start: start.to_vec(),
            stride: stride.to_vec(),
            count: count.to_vec(),
        });
        Ok(())
    }

    /// Total number of selected elements.
    pub fn element_count(&self) -> usize {
        self.slabs
            .iter()
            .map(|s| s.count.iter().product::<usize>())
            .sum()
    }

    /// Flatten the union into contiguous element runs `(linear_offset, len)`
    /// sorted by offset, the canonical enumeration order.
    pub(crate) fn spans(&self) -> Vec<(usize, usize)> {
        let rank = self.dims.len();
        // Row-major linear stride of each direction.
        let mut lin = vec![1usize; rank];
        for d in (0..rank.saturating_sub(1)).rev() {
            lin[d] = lin[d + 1] * self.dims[d + 1];
        }

        let mut spans = Vec::new();
        let inner = rank - 1;
        for slab in &self.slabs {
            if slab.count.iter().any(|&c| c == 0) {
                continue;
            }
            let mut idx = vec![0usize; inner];
            'outer: loop {
                let mut base = 0usize;
                for d in 0..inner {
                    base += (slab.start[d] + idx[d] * slab.stride[d]) * lin[d];
                }
                base += slab.start[inner];
                if slab.stride[inner] == 1 {
                    spans.push((base, slab.count[inner]));
                } else {
                    for i in 0..slab.count[inner] {
                        spans.push((base + i * slab.stride[inner], 1));
                    }
                }
                let mut d = inner;
                while d > 0 {
                    d -= 1;
                    idx[d] += 1;
                    if idx[d] < slab.count[d] {
                        continue 'outer;
                    }
                    idx[d] = 0;
                }
                break;
            }
        }
        spans.sort_unstable_by_key(|s| s.0);
        // Coalesce touching runs so transfers see maximal contiguous extents.
        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
        for (off, len) in spans {
            match merged.last_mut() {
                Some((prev_off, prev_len)) if *prev_off + *prev_len == off => *prev_len += len,
                _ => merged.push((off, len)),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_block_in_3d() {
        // 4x3x2 extent, block at (1,0,0) of shape (2,3,2): rows 1..3 whole.
        let sel = Selection::hyperslab(&[4, 3, 2], &[1, 0, 0], &[2, 3, 2]).unwrap();
        assert_eq!(sel.element_count(), 12);
        assert_eq!(sel.spans(), vec![(6, 6), (12, 6)]);
    }

    #[test]
    fn strided_runs_in_1d() {
        // Memory-style selection: runs of 2 every 6 elements.
        let mut sel = Selection::none(&[12]);
        sel.select(&[0], &[3], &[2]).unwrap();
        sel.select(&[6], &[3], &[2]).unwrap();
        assert_eq!(sel.spans(), vec![(0, 1), (3, 1), (6, 1), (9, 1)]);
    }

    #[test]
    fn union_enumerates_in_canonical_order() {
        // OR'd out of order; spans still come back offset-sorted.
        let mut sel = Selection::none(&[2, 6]);
        sel.select(&[0, 4], &[1, 1], &[2, 2]).unwrap();
        sel.select(&[0, 0], &[1, 1], &[2, 2]).unwrap();
        assert_eq!(
            sel.spans(),
            vec![(0, 2), (4, 4), (10, 2)],
            "row 0 of both blocks precedes row 1 of either"
        );
    }

    #[test]
    fn empty_selection_participates_with_no_spans() {
        let sel = Selection::none(&[4, 3, 2]);
        assert_eq!(sel.element_count(), 0);
        assert!(sel.spans().is_empty());
    }

    #[test]
    fn zero_count_slab_is_legal_and_empty() {
        let mut sel = Selection::none(&[5]);
        sel.select(&[2], &[1], &[0]).unwrap();
        assert_eq!(sel.element_count(), 0);
        assert!(sel.spans().is_empty());
    }

    #[test]
    fn out_of_bounds_selection_is_rejected() {
        let mut sel = Selection::none(&[4, 3, 2]);
        let err = sel.select(&[0, 0, 1], &[1, 1, 2], &[1, 1, 2]).unwrap_err();
        assert!(matches!(err, ContainerError::Mismatch(_)));
    }

    #[test]
    fn rank_mismatch_is_rejected() {
        let mut sel = Selection::none(&[4, 3]);
        assert!(sel.select(&[0], &[1], &[1]).is_err());
    }
}
