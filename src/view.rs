//! Array-view seam and mapping lifetime ownership
//!
//! The crate does not implement a numeric array type. Create and attach hand
//! a [`ViewSpec`] (pointer, shape, byte strides, contiguity capability) plus
//! a [`RegionGuard`] to an [`ArrayViewFactory`], and whatever that factory
//! builds is the caller's array. [`RawViewFactory`] is the built-in
//! implementation producing plain byte-level views.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dtype::ElementType;
use crate::error::{Result, ShmError};
use crate::region::BackingRegion;

/// Byte-layout capability of a produced view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contiguity {
    /// Standard packed row-major layout.
    CContiguous,
    /// Aligned and writable, but not necessarily packed. Views over padded
    /// layouts carry this tag.
    WellBehaved,
}

/// Everything an array library needs to wrap a mapped payload.
#[derive(Debug)]
pub struct ViewSpec {
    pub dtype: ElementType,
    /// Extents, one per dimension.
    pub shape: Vec<i64>,
    /// Per-dimension steps in bytes.
    pub byte_strides: Vec<i64>,
    pub contiguity: Contiguity,
    /// First payload byte, immediately after the region header. Valid for
    /// as long as the accompanying guard lives.
    pub data: *mut u8,
}

/// Owns a mapped region on behalf of the views that reference it.
///
/// Move-only: the mapping is released exactly once, when the guard drops.
/// View implementations that hand out derived references keep the guard
/// behind an `Arc` so the region outlives every reachable view.
#[derive(Debug)]
pub struct RegionGuard {
    region: BackingRegion,
    name: String,
}

impl RegionGuard {
    pub(crate) fn new(region: BackingRegion, name: &str) -> Self {
        Self {
            region,
            name: name.to_owned(),
        }
    }

    /// The user-visible name the region was created or attached under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the mapping in bytes (header included).
    pub fn len(&self) -> usize {
        self.region.len()
    }

    /// Whether the mapping is empty. Never true for a validated region.
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Flush dirty pages to the backing file.
    pub fn flush(&self) -> Result<()> {
        self.region.flush()
    }

    /// Flush dirty pages without waiting for completion.
    pub fn flush_async(&self) -> Result<()> {
        self.region.flush_async()
    }
}

impl Drop for RegionGuard {
    fn drop(&mut self) {
        // The unmap itself happens when the inner mapping drops; nobody can
        // observe a failure at that point, so record the release here.
        debug!(name = %self.name, "releasing shared array mapping");
    }
}

/// Builds the caller-facing array object from a mapped payload.
pub trait ArrayViewFactory {
    type View;

    /// Wrap a mapped payload. Implementations must keep `guard` alive for
    /// as long as the view, or anything derived from it, can reach
    /// `spec.data`.
    fn build(&self, spec: ViewSpec, guard: RegionGuard) -> Self::View;
}

/// Factory for the built-in [`RawArray`] view.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawViewFactory;

impl ArrayViewFactory for RawViewFactory {
    type View = RawArray;

    fn build(&self, spec: ViewSpec, guard: RegionGuard) -> RawArray {
        RawArray {
            dtype: spec.dtype,
            shape: spec.shape,
            byte_strides: spec.byte_strides,
            contiguity: spec.contiguity,
            data: spec.data,
            guard: Arc::new(guard),
        }
    }
}

/// Built-in view over a mapped payload.
///
/// Clones are derived views: they share the mapping through the same guard,
/// and the region stays mapped until the last one drops. Element access is
/// bounds-checked against the shape; the bytes themselves are shared memory,
/// so concurrent writers in other processes race exactly as shared memory
/// always does.
#[derive(Debug, Clone)]
pub struct RawArray {
    dtype: ElementType,
    shape: Vec<i64>,
    byte_strides: Vec<i64>,
    contiguity: Contiguity,
    data: *mut u8,
    guard: Arc<RegionGuard>,
}

// The raw data pointer targets a shared mapping that lives as long as the
// guard; moving a view across threads moves access to memory that other
// processes already touch concurrently.
unsafe impl Send for RawArray {}
unsafe impl Sync for RawArray {}

impl RawArray {
    /// Element type of the array.
    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    /// Extents, one per dimension.
    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    /// Per-dimension steps in bytes.
    pub fn byte_strides(&self) -> &[i64] {
        &self.byte_strides
    }

    /// Number of dimensions.
    pub fn ndims(&self) -> usize {
        self.shape.len()
    }

    /// Byte-layout capability reported for this view.
    pub fn contiguity(&self) -> Contiguity {
        self.contiguity
    }

    /// The name the array was created or attached under.
    pub fn name(&self) -> &str {
        self.guard.name()
    }

    /// Byte offset of a logical index into the payload.
    pub fn byte_offset(&self, index: &[i64]) -> Result<usize> {
        if index.len() != self.shape.len() {
            return Err(ShmError::invalid_parameter(
                "index",
                format!(
                    "expected {} indices, got {}",
                    self.shape.len(),
                    index.len()
                ),
            ));
        }
        let mut offset = 0i64;
        for (i, (&idx, &dim)) in index.iter().zip(&self.shape).enumerate() {
            if idx < 0 || idx >= dim {
                return Err(ShmError::invalid_parameter(
                    "index",
                    format!("index {} out of bounds for dimension {} of extent {}", idx, i, dim),
                ));
            }
            offset += idx * self.byte_strides[i];
        }
        Ok(offset as usize)
    }

    /// Read the element at `index`.
    ///
    /// `T` must have the exact size of the array's element type; the value
    /// is read bitwise, so any `Copy` type of the right width works (e.g.
    /// `u16` for half floats).
    pub fn read<T: Copy>(&self, index: &[i64]) -> Result<T> {
        self.check_element_width::<T>()?;
        let offset = self.byte_offset(index)?;
        Ok(unsafe { std::ptr::read_unaligned(self.data.add(offset) as *const T) })
    }

    /// Write the element at `index`.
    pub fn write<T: Copy>(&self, index: &[i64], value: T) -> Result<()> {
        self.check_element_width::<T>()?;
        let offset = self.byte_offset(index)?;
        unsafe { std::ptr::write_unaligned(self.data.add(offset) as *mut T, value) };
        Ok(())
    }

    /// The payload as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.data, self.payload_len()) }
    }

    /// The payload as mutable raw bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.data, self.payload_len()) }
    }

    /// Flush the backing mapping to its file.
    pub fn flush(&self) -> Result<()> {
        self.guard.flush()
    }

    /// Payload span in bytes. Row-major layouts put the largest stride
    /// first, so the span is the outermost stride times its extent.
    fn payload_len(&self) -> usize {
        match self.shape.first() {
            Some(&outer) => (self.byte_strides[0] * outer) as usize,
            None => self.dtype.size(),
        }
    }

    fn check_element_width<T>(&self) -> Result<()> {
        if std::mem::size_of::<T>() != self.dtype.size() {
            return Err(ShmError::invalid_parameter(
                "element",
                format!(
                    "access width {} does not match {} element size {}",
                    std::mem::size_of::<T>(),
                    self.dtype.name(),
                    self.dtype.size()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn raw_array(dir: &TempDir, shape: &[i64], strides: &[i64]) -> RawArray {
        let elem = ElementType::Float64;
        let elem_size = elem.size() as i64;
        let payload: i64 = match shape.first() {
            Some(&outer) => outer * strides[0] * elem_size,
            None => elem_size,
        };
        let path = dir.path().join("view_region");
        let region =
            BackingRegion::create(&path, crate::descriptor::HEADER_SIZE + payload as usize)
                .unwrap();
        let spec = ViewSpec {
            dtype: elem,
            shape: shape.to_vec(),
            byte_strides: strides.iter().map(|s| s * elem_size).collect(),
            contiguity: Contiguity::WellBehaved,
            data: region.payload_ptr(),
        };
        RawViewFactory.build(spec, RegionGuard::new(region, "view_region"))
    }

    #[test]
    fn test_read_write_roundtrip() {
        let dir = TempDir::new().unwrap();
        let array = raw_array(&dir, &[4, 5], &[5, 1]);

        array.write(&[1, 2], 42.5f64).unwrap();
        assert_eq!(array.read::<f64>(&[1, 2]).unwrap(), 42.5);
        assert_eq!(array.read::<f64>(&[0, 0]).unwrap(), 0.0);
    }

    #[test]
    fn test_bounds_checking() {
        let dir = TempDir::new().unwrap();
        let array = raw_array(&dir, &[4, 5], &[5, 1]);

        assert!(array.read::<f64>(&[4, 0]).is_err());
        assert!(array.read::<f64>(&[0, -1]).is_err());
        assert!(array.read::<f64>(&[0]).is_err());
    }

    #[test]
    fn test_element_width_checking() {
        let dir = TempDir::new().unwrap();
        let array = raw_array(&dir, &[4, 5], &[5, 1]);

        let err = array.read::<u32>(&[0, 0]).unwrap_err();
        assert!(matches!(err, ShmError::InvalidParameter { .. }));
    }

    #[test]
    fn test_scalar_view() {
        let dir = TempDir::new().unwrap();
        let array = raw_array(&dir, &[], &[]);

        array.write(&[], 7.25f64).unwrap();
        assert_eq!(array.read::<f64>(&[]).unwrap(), 7.25);
        assert_eq!(array.as_bytes().len(), 8);
    }

    #[test]
    fn test_derived_view_shares_mapping() {
        let dir = TempDir::new().unwrap();
        let array = raw_array(&dir, &[4, 5], &[5, 1]);

        let derived = array.clone();
        array.write(&[3, 4], -1.0f64).unwrap();
        drop(array);

        // The mapping survives through the derived view's guard.
        assert_eq!(derived.read::<f64>(&[3, 4]).unwrap(), -1.0);
    }
}
