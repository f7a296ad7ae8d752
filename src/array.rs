//! Create, attach, delete, and list shared arrays
//!
//! The only entry point callers exercise. Create composes the layout engine,
//! the descriptor codec, and the region manager; attach composes the codec
//! and the region manager; delete is purely a filesystem operation.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{ArrayDescriptor, HEADER_SIZE};
use crate::dtype::ElementType;
use crate::error::{Result, ShmError};
use crate::layout;
use crate::region::BackingRegion;
use crate::view::{ArrayViewFactory, Contiguity, RawViewFactory, RegionGuard, ViewSpec};

/// Maps user-supplied array names to backing-file paths.
///
/// Name resolution is a pure string-to-path concern; everything the factory
/// needs from it is the resolved path and, for listing, the set of candidate
/// names.
pub trait PathResolver {
    /// Resolve an array name to the path of its backing file.
    fn resolve(&self, name: &str) -> Result<PathBuf>;

    /// Candidate array names, for listing. Resolvers without an enumerable
    /// backing store may leave this unimplemented.
    fn names(&self) -> Result<Vec<String>> {
        Err(ShmError::unsupported("listing array names"))
    }
}

/// Resolver mapping `name` to `<base>/<name>` in a flat backing directory.
#[derive(Debug, Clone)]
pub struct FlatDirResolver {
    base: PathBuf,
}

impl FlatDirResolver {
    /// Resolver rooted at an explicit backing directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// System default backing directory: tmpfs-backed `/dev/shm` on Linux,
    /// the temp directory elsewhere.
    pub fn system_default() -> Self {
        #[cfg(target_os = "linux")]
        {
            Self::new("/dev/shm")
        }
        #[cfg(not(target_os = "linux"))]
        {
            Self::new(std::env::temp_dir())
        }
    }

    /// The backing directory.
    pub fn base(&self) -> &std::path::Path {
        &self.base
    }
}

impl Default for FlatDirResolver {
    fn default() -> Self {
        Self::system_default()
    }
}

impl PathResolver for FlatDirResolver {
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() {
            return Err(ShmError::invalid_parameter(
                "name",
                "array name cannot be empty",
            ));
        }
        if name.contains('/') || name.contains('\0') {
            return Err(ShmError::invalid_parameter(
                "name",
                "array name cannot contain path separators or NUL",
            ));
        }
        Ok(self.base.join(name))
    }

    fn names(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base)
            .map_err(|e| ShmError::from_io(e, "failed to read backing directory"))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ShmError::from_io(e, "failed to read backing directory"))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Identity of one shared array, as reported by [`SharedArrayHost::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayInfo {
    pub name: String,
    pub dtype: ElementType,
    pub shape: Vec<i64>,
}

/// Entry point for creating, attaching, deleting, and listing shared arrays.
///
/// Generic over the array-view factory that wraps mapped payloads and the
/// resolver that turns names into paths. Every operation is synchronous and
/// carries no state across calls; concurrency is inter-process and rests on
/// the filesystem's exclusive-create and unlink-after-open semantics.
#[derive(Debug)]
pub struct SharedArrayHost<F = RawViewFactory, R = FlatDirResolver> {
    factory: F,
    resolver: R,
}

impl SharedArrayHost {
    /// Host with the built-in raw view factory and the system default
    /// backing directory.
    pub fn new() -> Self {
        Self {
            factory: RawViewFactory,
            resolver: FlatDirResolver::system_default(),
        }
    }
}

impl Default for SharedArrayHost {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ArrayViewFactory, R: PathResolver> SharedArrayHost<F, R> {
    /// Host with an explicit view factory and path resolver.
    pub fn with_parts(factory: F, resolver: R) -> Self {
        Self { factory, resolver }
    }

    /// Create a named shared array and return a view over its payload.
    ///
    /// The backing file is created exclusively; a taken name fails without
    /// touching the existing region. Shape and type are validated before any
    /// file exists. With `aligned` set, inner dimensions are padded to
    /// 64-byte units (see [`layout::plan`]); created views always carry the
    /// [`Contiguity::WellBehaved`] tag since padding can leave the layout
    /// unpacked.
    pub fn create(
        &self,
        name: &str,
        shape: &[i64],
        dtype: ElementType,
        aligned: bool,
    ) -> Result<F::View> {
        let path = self.resolver.resolve(name)?;

        let mut descr = ArrayDescriptor::encode(dtype, shape)?;
        let plan = layout::plan(shape, dtype.size(), aligned)?;
        descr.set_strides(&plan.strides[..shape.len()]);

        let mut region = BackingRegion::create(&path, plan.total_size)?;
        descr.write_to(region.as_mut_slice());

        let elem_size = dtype.size() as i64;
        let byte_strides: Vec<i64> = plan.strides[..shape.len()]
            .iter()
            .map(|s| s * elem_size)
            .collect();

        debug!(name, ?shape, dtype = %dtype, aligned, "created shared array");

        let spec = ViewSpec {
            dtype,
            shape: shape.to_vec(),
            byte_strides,
            contiguity: Contiguity::WellBehaved,
            data: region.payload_ptr(),
        };
        Ok(self.factory.build(spec, RegionGuard::new(region, name)))
    }

    /// Attach to an existing named shared array.
    ///
    /// The region's header is validated and its shape and strides are
    /// treated as foreign input: extents and strides must be non-negative
    /// and the payload they describe must fit inside the mapped file. A
    /// region whose layout passes the row-major packing test is tagged
    /// [`Contiguity::CContiguous`]; otherwise it gets the generic
    /// [`Contiguity::WellBehaved`] tag. On any validation failure the
    /// mapping is released before the error is returned.
    pub fn attach(&self, name: &str) -> Result<F::View> {
        let path = self.resolver.resolve(name)?;
        let region = BackingRegion::open(&path)?;

        let descr = ArrayDescriptor::decode(region.as_slice(), name)?;
        let dtype = descr.element_type()?;
        let shape = descr.shape().to_vec();
        let strides = descr.strides().to_vec();

        validate_foreign_layout(name, &region, dtype, &shape, &strides)?;

        let ndims = shape.len();
        let contiguous = (0..ndims.saturating_sub(1))
            .all(|i| strides[i] == shape[i + 1] * strides[i + 1]);
        let contiguity = if contiguous {
            Contiguity::CContiguous
        } else {
            Contiguity::WellBehaved
        };

        let elem_size = dtype.size() as i64;
        let byte_strides: Vec<i64> = strides.iter().map(|s| s * elem_size).collect();

        debug!(name, ?shape, dtype = %dtype, ?contiguity, "attached shared array");

        let spec = ViewSpec {
            dtype,
            shape,
            byte_strides,
            contiguity,
            data: region.payload_ptr(),
        };
        Ok(self.factory.build(spec, RegionGuard::new(region, name)))
    }

    /// Delete the backing file of a named shared array.
    ///
    /// Purely a filesystem unlink: existing mappings and views, in this or
    /// any other process, remain valid until their guards drop.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolver.resolve(name)?;
        BackingRegion::delete(&path)?;
        debug!(name, "deleted shared array");
        Ok(())
    }

    /// List the valid shared arrays the resolver can enumerate.
    ///
    /// Files that fail header validation (foreign files, partial writes)
    /// are skipped, not reported as errors.
    pub fn list(&self) -> Result<Vec<ArrayInfo>> {
        let mut infos = Vec::new();
        for name in self.resolver.names()? {
            let Ok(path) = self.resolver.resolve(&name) else {
                continue;
            };
            let Ok(region) = BackingRegion::open(&path) else {
                continue;
            };
            let Ok(descr) = ArrayDescriptor::decode(region.as_slice(), &name) else {
                continue;
            };
            let Ok(dtype) = descr.element_type() else {
                continue;
            };
            infos.push(ArrayInfo {
                name,
                dtype,
                shape: descr.shape().to_vec(),
            });
        }
        Ok(infos)
    }
}

/// Reject descriptors whose extents or strides cannot describe a payload
/// inside the mapped file. A shared file can be truncated or corrupted by
/// any process that can reach it; nothing read from it is trusted until it
/// passes here.
fn validate_foreign_layout(
    name: &str,
    region: &BackingRegion,
    dtype: ElementType,
    shape: &[i64],
    strides: &[i64],
) -> Result<()> {
    let elem_size = dtype.size() as i64;
    // Largest byte offset any in-bounds index can reach, plus one element.
    // Extents are >= 1 once the sign check passes: zero is the terminator
    // and never appears in a decoded shape.
    let mut span = elem_size;
    for (&dim, &stride) in shape.iter().zip(strides) {
        if dim < 0 || stride < 0 {
            return Err(ShmError::not_an_array(name));
        }
        let reach = (dim - 1)
            .checked_mul(stride)
            .and_then(|r| r.checked_mul(elem_size))
            .ok_or_else(|| ShmError::not_an_array(name))?;
        span = span
            .checked_add(reach)
            .ok_or_else(|| ShmError::not_an_array(name))?;
    }
    if HEADER_SIZE as i64 + span > region.len() as i64 {
        return Err(ShmError::not_an_array(name));
    }
    Ok(())
}
