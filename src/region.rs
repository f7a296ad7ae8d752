//! Backing-file management and memory mapping
//!
//! The only module that touches the filesystem or the address space. A
//! [`BackingRegion`] owns the whole-file shared mapping of one backing file;
//! the mapping is released when the region is dropped, while the file itself
//! persists until explicitly deleted.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::descriptor::HEADER_SIZE;
use crate::error::{Result, ShmError};

/// File mode for newly created regions. Independent processes must be able
/// to attach, so regions are world read/write modulo the caller's umask.
const REGION_MODE: u32 = 0o666;

/// A backing file plus its active shared memory mapping.
#[derive(Debug)]
pub struct BackingRegion {
    mmap: MmapMut,
    path: PathBuf,
}

impl BackingRegion {
    /// Create the backing file exclusively, grow it to `total_size`, and map
    /// it shared read/write.
    ///
    /// The file is created with fail-if-exists semantics so two creators
    /// cannot silently overwrite each other's header. After growing, the
    /// file is stat'd again and the mapping covers whatever size actually
    /// resulted, since some filesystems round the length up. The file
    /// descriptor is closed once the mapping exists; the mapping stays
    /// valid without it.
    pub fn create(path: &Path, total_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(REGION_MODE)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => ShmError::array_exists(path.display().to_string()),
                _ => ShmError::from_io(e, "failed to create backing file"),
            })?;

        file.set_len(total_size as u64)
            .map_err(|e| ShmError::from_io(e, "failed to grow backing file"))?;

        let actual_size = file
            .metadata()
            .map_err(|e| ShmError::from_io(e, "failed to stat backing file"))?
            .len();

        let mmap = unsafe { MmapOptions::new().map_mut(&file) }
            .map_err(|e| ShmError::from_io(e, "failed to map backing file"))?;

        debug!(
            path = %path.display(),
            size = actual_size,
            "created shared region"
        );

        Ok(Self {
            mmap,
            path: path.to_owned(),
        })
    }

    /// Open an existing backing file and map it shared read/write.
    ///
    /// Files shorter than the region header are rejected before mapping;
    /// the header contents are not validated here, that is the descriptor
    /// codec's job.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ShmError::array_not_found(path.display().to_string()),
                _ => ShmError::from_io(e, "failed to open backing file"),
            })?;

        let size = file
            .metadata()
            .map_err(|e| ShmError::from_io(e, "failed to stat backing file"))?
            .len();

        if (size as usize) < HEADER_SIZE {
            return Err(ShmError::not_an_array(path.display().to_string()));
        }

        let mmap = unsafe { MmapOptions::new().map_mut(&file) }
            .map_err(|e| ShmError::from_io(e, "failed to map backing file"))?;

        debug!(path = %path.display(), size, "opened shared region");

        Ok(Self {
            mmap,
            path: path.to_owned(),
        })
    }

    /// Remove a backing file by path. Existing mappings and views stay
    /// valid; only the name goes away.
    pub fn delete(path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ShmError::array_not_found(path.display().to_string()),
            _ => ShmError::from_io(e, "failed to delete backing file"),
        })?;
        debug!(path = %path.display(), "deleted shared region");
        Ok(())
    }

    /// Size of the mapping in bytes (header included).
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Whether the mapping is empty. Never true for a validated region.
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The mapped bytes (read-only).
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// The mapped bytes (mutable).
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// Pointer to the first payload byte, immediately after the header.
    ///
    /// The pointer is valid for the lifetime of the mapping. Writes through
    /// it alias the mapping the way shared memory always does.
    pub(crate) fn payload_ptr(&self) -> *mut u8 {
        unsafe { self.mmap.as_ptr().add(HEADER_SIZE) as *mut u8 }
    }

    /// Flush dirty pages to the backing file.
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| ShmError::from_io(e, "failed to flush memory mapping"))
    }

    /// Flush dirty pages without waiting for completion.
    pub fn flush_async(&self) -> Result<()> {
        self.mmap
            .flush_async()
            .map_err(|e| ShmError::from_io(e, "failed to flush memory mapping asynchronously"))
    }
}
