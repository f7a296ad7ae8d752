//! Supported element types and their wire codes

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShmError};

/// Element types a shared array region can hold.
///
/// Each variant carries a stable `i32` wire code stored in the region header.
/// Gaps in the numbering are reserved for type kinds this crate refuses
/// (strings, objects, structured records, datetimes, user-defined types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float16,
    Float32,
    Float64,
    /// Extended-precision float (x87 long double, 16 bytes on x86-64)
    Float128,
    Complex64,
    Complex128,
    Complex256,
}

/// Alias wire codes for 64-bit integers: on LP64 platforms two distinct
/// codes describe the same 8-byte layout. They decode to the canonical
/// variant and are never written back.
const INT64_ALIAS: i32 = 9;
const UINT64_ALIAS: i32 = 10;

impl ElementType {
    /// All supported element types, in wire-code order.
    pub const ALL: [ElementType; 16] = [
        Self::Bool,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::Float128,
        Self::Complex64,
        Self::Complex128,
        Self::Complex256,
        Self::Float16,
    ];

    /// The wire code written into region headers.
    pub fn code(self) -> i32 {
        match self {
            Self::Bool => 0,
            Self::Int8 => 1,
            Self::UInt8 => 2,
            Self::Int16 => 3,
            Self::UInt16 => 4,
            Self::Int32 => 5,
            Self::UInt32 => 6,
            Self::Int64 => 7,
            Self::UInt64 => 8,
            Self::Float32 => 11,
            Self::Float64 => 12,
            Self::Float128 => 13,
            Self::Complex64 => 14,
            Self::Complex128 => 15,
            Self::Complex256 => 16,
            Self::Float16 => 23,
        }
    }

    /// Decode a wire code, accepting the 64-bit integer aliases.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Bool),
            1 => Ok(Self::Int8),
            2 => Ok(Self::UInt8),
            3 => Ok(Self::Int16),
            4 => Ok(Self::UInt16),
            5 => Ok(Self::Int32),
            6 => Ok(Self::UInt32),
            7 | INT64_ALIAS => Ok(Self::Int64),
            8 | UINT64_ALIAS => Ok(Self::UInt64),
            11 => Ok(Self::Float32),
            12 => Ok(Self::Float64),
            13 => Ok(Self::Float128),
            14 => Ok(Self::Complex64),
            15 => Ok(Self::Complex128),
            16 => Ok(Self::Complex256),
            23 => Ok(Self::Float16),
            other => Err(ShmError::unsupported_type(other)),
        }
    }

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Complex64 => 8,
            Self::Float128 | Self::Complex128 => 16,
            Self::Complex256 => 32,
        }
    }

    /// Human-readable type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Float128 => "float128",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::Complex256 => "complex256",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
