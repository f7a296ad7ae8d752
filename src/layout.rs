//! Stride and size computation for array payloads
//!
//! Layouts are row-major. The aligned variant pads every extent beyond the
//! outermost dimension up to a 64-byte unit so that sub-arrays along the
//! outer dimension start on cache-line boundaries, trading space for
//! predictable alignment.

use crate::descriptor::{HEADER_SIZE, MAX_DIMS};
use crate::error::{Result, ShmError};

/// Alignment unit, in bytes, that padded extents round up to.
pub const ALIGN_BYTES: i64 = 64;

/// Result of planning a payload layout. Produced once per create call, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    /// Per-dimension element strides (not scaled by element size).
    pub strides: [i64; MAX_DIMS],
    /// Extents actually used by the stride and size products. Identical to
    /// the requested shape unless the layout is aligned, in which case every
    /// dimension beyond the first is rounded up.
    pub extents: [i64; MAX_DIMS],
    /// Payload bytes, excluding the region header.
    pub payload_size: usize,
    /// Header plus payload: the size the backing file is grown to.
    pub total_size: usize,
}

/// Round `extent` up to the next multiple of `ALIGN_BYTES / elem_size`
/// elements, so a run of that many elements spans a whole number of 64-byte
/// blocks.
fn round_up_extent(extent: i64, elem_size: usize) -> i64 {
    let unit = (ALIGN_BYTES / elem_size as i64).max(1);
    if extent % unit == 0 {
        extent
    } else {
        (extent / unit + 1) * unit
    }
}

/// Compute the layout of a payload with the given shape and element size.
///
/// Unaligned layouts are standard packed row-major. Aligned layouts pad
/// every extent at dimension index >= 1; dimension 0 is never padded, so the
/// stride and size products mix padded and unpadded extents asymmetrically.
/// That asymmetry is part of the on-disk contract: the padded extents feed
/// both the stride products and the payload size, while dimension 0
/// contributes its unpadded extent to the size only.
pub fn plan(shape: &[i64], elem_size: usize, aligned: bool) -> Result<LayoutPlan> {
    let ndims = shape.len();
    if ndims > MAX_DIMS {
        return Err(ShmError::too_many_dims(ndims));
    }

    let mut extents = [0i64; MAX_DIMS];
    for (i, &dim) in shape.iter().enumerate() {
        extents[i] = if aligned && i > 0 {
            round_up_extent(dim, elem_size)
        } else {
            dim
        };
    }

    let mut strides = [0i64; MAX_DIMS];
    for i in 0..ndims {
        let mut stride = 1i64;
        for &ext in &extents[i + 1..ndims] {
            stride = stride
                .checked_mul(ext)
                .ok_or_else(|| ShmError::invalid_parameter("shape", "array size overflows"))?;
        }
        strides[i] = stride;
    }

    let mut payload = elem_size as i64;
    for &ext in &extents[..ndims] {
        payload = payload
            .checked_mul(ext)
            .ok_or_else(|| ShmError::invalid_parameter("shape", "array size overflows"))?;
    }

    let payload_size = payload as usize;
    Ok(LayoutPlan {
        strides,
        extents,
        payload_size,
        total_size: HEADER_SIZE + payload_size,
    })
}
