//! Fixed binary header identifying a shared array region
//!
//! Every backing region starts with a 128-byte descriptor: a magic sentinel,
//! the element type code, up to [`MAX_DIMS`] extents and element strides, and
//! two reserved fields. The descriptor is stored in host byte order; regions
//! are not portable across architectures with differing endianness.

use crate::dtype::ElementType;
use crate::error::{Result, ShmError};

/// Maximum number of dimensions a region header can describe.
pub const MAX_DIMS: usize = 7;

/// Sentinel marking a valid region header.
pub const MAGIC: i32 = 0x5f3759df;

/// Number of bytes the descriptor occupies at the start of every region.
pub const HEADER_SIZE: usize = 128;

/// On-disk region header.
///
/// The `shape` array is terminated by its first zero entry; the
/// dimensionality is derived by scanning, not stored. `stride` holds element
/// strides (not byte strides), parallel to `shape`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ArrayDescriptor {
    magic: i32,
    type_code: i32,
    shape: [i64; MAX_DIMS],
    stride: [i64; MAX_DIMS],
    pad: [i32; 2],
}

// The descriptor is a cross-process binary contract. A platform where this
// assertion fails cannot exchange regions with anything else and must not
// build.
const _: () = assert!(std::mem::size_of::<ArrayDescriptor>() == HEADER_SIZE);

impl ArrayDescriptor {
    /// Build a descriptor for a new region.
    ///
    /// Strides are left zeroed; the layout computation fills them in via
    /// [`set_strides`](Self::set_strides). Fails if `shape` has more than
    /// [`MAX_DIMS`] entries or contains a non-positive extent: a zero extent
    /// is reserved as the dimension terminator and cannot be stored.
    pub fn encode(dtype: ElementType, shape: &[i64]) -> Result<Self> {
        if shape.len() > MAX_DIMS {
            return Err(ShmError::too_many_dims(shape.len()));
        }
        for &dim in shape {
            if dim <= 0 {
                return Err(ShmError::invalid_parameter(
                    "shape",
                    format!("extents must be positive, got {}", dim),
                ));
            }
        }

        let mut descr = Self {
            magic: MAGIC,
            type_code: dtype.code(),
            shape: [0; MAX_DIMS],
            stride: [0; MAX_DIMS],
            pad: [0; 2],
        };
        descr.shape[..shape.len()].copy_from_slice(shape);
        Ok(descr)
    }

    /// Reinterpret the head of a mapped region as a descriptor and validate
    /// it.
    ///
    /// `name` labels the region in errors. A short buffer or a magic
    /// mismatch means the file is not a shared array; an unknown type code
    /// means it was written with an element type this build does not
    /// support.
    pub fn decode(bytes: &[u8], name: &str) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ShmError::not_an_array(name));
        }
        // Plain-old-data layout: every bit pattern of the underlying bytes
        // is a valid ArrayDescriptor value.
        let descr = unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const Self) };
        if descr.magic != MAGIC {
            return Err(ShmError::not_an_array(name));
        }
        ElementType::from_code(descr.type_code)?;
        Ok(descr)
    }

    /// Copy the descriptor to the head of a mapped region.
    pub fn write_to(&self, dst: &mut [u8]) {
        // repr(C) with no interior padding, asserted to be HEADER_SIZE.
        let src = unsafe {
            std::slice::from_raw_parts((self as *const Self).cast::<u8>(), HEADER_SIZE)
        };
        dst[..HEADER_SIZE].copy_from_slice(src);
    }

    /// Dimensionality: the count of extents before the first zero entry.
    pub fn ndims(&self) -> usize {
        self.shape.iter().position(|&dim| dim == 0).unwrap_or(MAX_DIMS)
    }

    /// Extents of the active dimensions.
    pub fn shape(&self) -> &[i64] {
        &self.shape[..self.ndims()]
    }

    /// Element strides of the active dimensions.
    pub fn strides(&self) -> &[i64] {
        &self.stride[..self.ndims()]
    }

    /// Fill in the element strides computed by the layout engine.
    pub fn set_strides(&mut self, strides: &[i64]) {
        debug_assert!(strides.len() <= MAX_DIMS);
        self.stride[..strides.len()].copy_from_slice(strides);
    }

    /// The element type stored in the header.
    pub fn element_type(&self) -> Result<ElementType> {
        ElementType::from_code(self.type_code)
    }

    /// The raw type code stored in the header.
    pub fn type_code(&self) -> i32 {
        self.type_code
    }
}
