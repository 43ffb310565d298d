//! Scalar/vector attributes and string annotations on the container root.
//!
//! Attributes are the 0-D end of the operation matrix: small named values
//! riding with the file rather than distributed datasets. Numeric values
//! travel through the driver widened to `f64` (exact over the closed scalar
//! universe) with the declared scalar type preserved; reads convert into the
//! caller's element type with the same native semantics as field transfers.

use core_container::Element;
use core_error::{Error, ErrorCode};

use crate::handle::Handle;
use crate::Result;

const ROOT: &str = "/";

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::new(ErrorCode::Fault, "attribute name must not be empty"));
    }
    Ok(())
}

impl Handle {
    /// Write a scalar attribute on the container root.
    pub fn attribute_write<T: Element>(&mut self, name: &str, value: T) -> Result<()> {
        self.attribute_writev(name, std::slice::from_ref(&value))
    }

    /// Write a vector attribute of `values.len()` components.
    pub fn attribute_writev<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()> {
        check_name(name)?;
        if values.is_empty() {
            return Err(Error::new(ErrorCode::Fault, "attribute value must not be empty"));
        }
        let widened: Vec<f64> = values.iter().map(|v| v.to_f64()).collect();
        self.container_mut()?
            .attribute_write_numeric(ROOT, name, T::SCALAR, &widened)
            .map_err(crate::failed)?;
        tracing::debug!(target: "field", name, components = values.len(), "attribute_written");
        Ok(())
    }

    /// Read a scalar attribute.
    pub fn attribute_read<T: Element>(&self, name: &str) -> Result<T> {
        let mut value = [T::default()];
        self.attribute_readv(name, &mut value)?;
        Ok(value[0])
    }

    /// Read a vector attribute; `out.len()` must equal the stored component
    /// count.
    pub fn attribute_readv<T: Element>(&self, name: &str, out: &mut [T]) -> Result<()> {
        check_name(name)?;
        let container = self.container()?;
        let Some((_, values)) = container.attribute_read_numeric(ROOT, name) else {
            return Err(Error::new(
                ErrorCode::Failed,
                format!("no such attribute '{name}'"),
            ));
        };
        if values.len() != out.len() {
            return Err(Error::new(
                ErrorCode::Invalid,
                format!(
                    "attribute '{name}' holds {} components, caller expects {}",
                    values.len(),
                    out.len()
                ),
            ));
        }
        for (slot, v) in out.iter_mut().zip(values) {
            *slot = T::from_f64(v);
        }
        Ok(())
    }

    /// Stored component count of a numeric attribute.
    pub fn attribute_sizev(&self, name: &str) -> Result<usize> {
        check_name(name)?;
        self.container()?
            .attribute_len(ROOT, name)
            .ok_or_else(|| Error::new(ErrorCode::Failed, format!("no such attribute '{name}'")))
    }

    /// Attach a text annotation to the container root.
    pub fn string_set(&mut self, name: &str, value: &str) -> Result<()> {
        check_name(name)?;
        self.container_mut()?
            .attribute_write_text(ROOT, name, value)
            .map_err(crate::failed)?;
        tracing::debug!(target: "field", name, "string_set");
        Ok(())
    }

    /// Read back a text annotation.
    pub fn string_get(&self, name: &str) -> Result<String> {
        check_name(name)?;
        self.container()?
            .attribute_read_text(ROOT, name)
            .ok_or_else(|| Error::new(ErrorCode::Failed, format!("no such string '{name}'")))
    }
}
