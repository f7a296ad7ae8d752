//! # Shmarray - Shared-Memory Numeric Arrays
//!
//! Shmarray lets independent processes share a single dense numeric array
//! backed by a memory-mapped file: one process creates the array, others
//! attach to it by name and see the same bytes, with no serialization step.
//!
//! ## Features
//!
//! - **Named backing regions**: a 128-byte self-describing header followed
//!   by the raw payload, in a file any process can map
//! - **Typed, strided views**: element type, shape, and byte strides are
//!   recovered from the header on attach, with row-major contiguity
//!   detection
//! - **Optional cache-line alignment**: inner dimensions can be padded so
//!   sub-arrays start on 64-byte boundaries
//! - **Defensive validation**: short, corrupt, or foreign files fail
//!   cleanly instead of crashing
//! - **Pluggable array library**: views are produced by an injected factory;
//!   the crate only supplies pointer, shape, strides, and a capability tag
//! - **Automatic unmapping**: each view owns its mapping through a guard
//!   that releases it exactly once, when the last reference drops
//!
//! ## Example
//!
//! ```no_run
//! use shmarray::{ElementType, SharedArrayHost};
//!
//! let host = SharedArrayHost::new();
//! let array = host.create("measurements", &[4, 5], ElementType::Float64, false)?;
//! array.write(&[1, 2], 42.5f64)?;
//!
//! // Any other process (or this one) can attach by name.
//! let attached = host.attach("measurements")?;
//! assert_eq!(attached.read::<f64>(&[1, 2])?, 42.5);
//!
//! host.delete("measurements")?;
//! # Ok::<(), shmarray::ShmError>(())
//! ```

// Core modules
pub mod array;
pub mod descriptor;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod region;
pub mod view;

// Main API re-exports
pub use array::{ArrayInfo, FlatDirResolver, PathResolver, SharedArrayHost};
pub use descriptor::{ArrayDescriptor, HEADER_SIZE, MAGIC, MAX_DIMS};
pub use dtype::ElementType;
pub use error::{Result, ShmError};
pub use layout::{LayoutPlan, ALIGN_BYTES};
pub use region::BackingRegion;
pub use view::{
    ArrayViewFactory, Contiguity, RawArray, RawViewFactory, RegionGuard, ViewSpec,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
