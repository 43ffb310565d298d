//! Plane and line operations: the field engine with higher directions held
//! at extent 1.
//!
//! A plane is `(B, A)` with C pinned, a line is `(A)` with C and B pinned.
//! Everything else (metadata, layout dispatch, validation, collectivity)
//! is exactly the 3-D path, so a "plane" written here is readable as a
//! degenerate field and vice versa.

use core_container::Element;
use core_layout::SubBlock;

use crate::handle::Handle;
use crate::Result;

impl Handle {
    pub fn plane_write<T: Element>(
        &mut self,
        name: &str,
        data: &[T],
        b: SubBlock,
        a: SubBlock,
    ) -> Result<()> {
        self.field_write(name, data, SubBlock::held(), b, a)
    }

    pub fn plane_writev<T: Element>(
        &mut self,
        name: &str,
        data: &[T],
        b: SubBlock,
        a: SubBlock,
        components: usize,
    ) -> Result<()> {
        self.field_writev(name, data, SubBlock::held(), b, a, components)
    }

    pub fn plane_read<T: Element>(
        &self,
        name: &str,
        data: &mut [T],
        b: SubBlock,
        a: SubBlock,
    ) -> Result<()> {
        self.field_read(name, data, SubBlock::held(), b, a)
    }

    pub fn plane_readv<T: Element>(
        &self,
        name: &str,
        data: &mut [T],
        b: SubBlock,
        a: SubBlock,
        components: usize,
    ) -> Result<()> {
        self.field_readv(name, data, SubBlock::held(), b, a, components)
    }

    /// Stored global extents `(B, A)` of a plane.
    pub fn plane_size(&self, name: &str) -> Result<(usize, usize)> {
        let (_, b, a, _) = self.field_sizev(name)?;
        Ok((b, a))
    }

    pub fn plane_sizev(&self, name: &str) -> Result<(usize, usize, usize)> {
        let (_, b, a, components) = self.field_sizev(name)?;
        Ok((b, a, components))
    }

    pub fn line_write<T: Element>(&mut self, name: &str, data: &[T], a: SubBlock) -> Result<()> {
        self.field_write(name, data, SubBlock::held(), SubBlock::held(), a)
    }

    pub fn line_writev<T: Element>(
        &mut self,
        name: &str,
        data: &[T],
        a: SubBlock,
        components: usize,
    ) -> Result<()> {
        self.field_writev(name, data, SubBlock::held(), SubBlock::held(), a, components)
    }

    pub fn line_read<T: Element>(&self, name: &str, data: &mut [T], a: SubBlock) -> Result<()> {
        self.field_read(name, data, SubBlock::held(), SubBlock::held(), a)
    }

    pub fn line_readv<T: Element>(
        &self,
        name: &str,
        data: &mut [T],
        a: SubBlock,
        components: usize,
    ) -> Result<()> {
        self.field_readv(name, data, SubBlock::held(), SubBlock::held(), a, components)
    }

    /// Stored global extent `A` of a line.
    pub fn line_size(&self, name: &str) -> Result<usize> {
        let (_, _, a, _) = self.field_sizev(name)?;
        Ok(a)
    }

    pub fn line_sizev(&self, name: &str) -> Result<(usize, usize)> {
        let (_, _, a, components) = self.field_sizev(name)?;
        Ok((a, components))
    }
}
