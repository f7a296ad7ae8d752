//! Integration tests for defensive validation of foreign regions

use std::fs;

use shmarray::{
    ElementType, FlatDirResolver, RawViewFactory, SharedArrayHost, ShmError, HEADER_SIZE, MAGIC,
};
use tempfile::TempDir;

fn host_in(dir: &TempDir) -> SharedArrayHost {
    SharedArrayHost::with_parts(RawViewFactory, FlatDirResolver::new(dir.path()))
}

/// A 128-byte header with the given type code and a one-dimensional shape.
fn raw_header(type_code: i32, extent: i64) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(&MAGIC.to_ne_bytes());
    bytes[4..8].copy_from_slice(&type_code.to_ne_bytes());
    bytes[8..16].copy_from_slice(&extent.to_ne_bytes()); // shape[0]
    bytes[64..72].copy_from_slice(&1i64.to_ne_bytes()); // stride[0]
    bytes
}

#[test]
fn test_attach_missing_array() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    let err = host.attach("never_created").unwrap_err();
    assert!(matches!(err, ShmError::ArrayNotFound { .. }));
}

#[test]
fn test_attach_short_file() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    fs::write(dir.path().join("stub"), vec![0u8; HEADER_SIZE - 1]).unwrap();

    let err = host.attach("stub").unwrap_err();
    assert!(matches!(err, ShmError::NotAnArray { .. }));
}

#[test]
fn test_attach_bad_magic() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    fs::write(dir.path().join("garbage"), vec![0xFFu8; 4096]).unwrap();

    let err = host.attach("garbage").unwrap_err();
    assert!(matches!(err, ShmError::NotAnArray { .. }));
}

#[test]
fn test_attach_half_written_header() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    // A creator that has grown the file but not yet written the header:
    // attach must fail cleanly, not crash.
    fs::write(dir.path().join("in_flight"), vec![0u8; 4096]).unwrap();

    let err = host.attach("in_flight").unwrap_err();
    assert!(matches!(err, ShmError::NotAnArray { .. }));
}

#[test]
fn test_attach_unsupported_type_code() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    let mut bytes = raw_header(18, 2); // string kind
    bytes.extend_from_slice(&[0u8; 256]);
    fs::write(dir.path().join("stringy"), bytes).unwrap();

    let err = host.attach("stringy").unwrap_err();
    assert!(matches!(err, ShmError::UnsupportedType { code: 18 }));
}

#[test]
fn test_attach_alias_integer_code() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    // The secondary 64-bit integer code decodes to the canonical variant.
    let mut bytes = raw_header(9, 4);
    bytes.extend_from_slice(&[0u8; 64]);
    fs::write(dir.path().join("aliased"), bytes).unwrap();

    let attached = host.attach("aliased").unwrap();
    assert_eq!(attached.dtype(), ElementType::Int64);
    assert_eq!(attached.shape(), &[4]);
}

#[test]
fn test_attach_hostile_extents() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    // Negative extent
    let mut bytes = raw_header(12, -4);
    bytes.extend_from_slice(&[0u8; 256]);
    fs::write(dir.path().join("negative"), bytes).unwrap();
    let err = host.attach("negative").unwrap_err();
    assert!(matches!(err, ShmError::NotAnArray { .. }));

    // Extent far beyond the mapped payload
    let mut bytes = raw_header(12, 1 << 40);
    bytes.extend_from_slice(&[0u8; 256]);
    fs::write(dir.path().join("oversized"), bytes).unwrap();
    let err = host.attach("oversized").unwrap_err();
    assert!(matches!(err, ShmError::NotAnArray { .. }));
}

#[test]
fn test_create_name_collision() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    host.create("taken", &[4], ElementType::Float64, false).unwrap();

    let err = host
        .create("taken", &[9, 9], ElementType::Int8, false)
        .unwrap_err();
    assert!(matches!(err, ShmError::ArrayExists { .. }));

    // The original region is untouched.
    let attached = host.attach("taken").unwrap();
    assert_eq!(attached.shape(), &[4]);
    assert_eq!(attached.dtype(), ElementType::Float64);
}

#[test]
fn test_create_rejects_bad_shapes_without_files() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    let err = host
        .create("deep", &[1; 8], ElementType::Float64, false)
        .unwrap_err();
    assert!(matches!(err, ShmError::TooManyDims { ndims: 8, .. }));

    let err = host
        .create("zeroed", &[4, 0, 3], ElementType::Float64, false)
        .unwrap_err();
    assert!(matches!(err, ShmError::InvalidParameter { .. }));

    // Neither attempt left a backing file behind.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_empty_name_rejected() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    let err = host.create("", &[4], ElementType::Float64, false).unwrap_err();
    assert!(matches!(err, ShmError::InvalidParameter { .. }));

    let err = host.attach("").unwrap_err();
    assert!(matches!(err, ShmError::InvalidParameter { .. }));
}

#[test]
fn test_delete_missing_array() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    let err = host.delete("absent").unwrap_err();
    assert!(matches!(err, ShmError::ArrayNotFound { .. }));
}

#[test]
fn test_delete_then_attach_fails() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    host.create("ephemeral", &[4], ElementType::Float64, false).unwrap();
    host.delete("ephemeral").unwrap();

    let err = host.attach("ephemeral").unwrap_err();
    assert!(matches!(err, ShmError::ArrayNotFound { .. }));
}

#[test]
fn test_list_reports_valid_arrays_only() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);

    host.create("first", &[2, 3], ElementType::Float64, false).unwrap();
    host.create("second", &[7], ElementType::Int32, false).unwrap();

    // Foreign files in the backing directory are skipped.
    fs::write(dir.path().join("not_an_array"), b"plain text").unwrap();

    let infos = host.list().unwrap();
    assert_eq!(infos.len(), 2);

    let first = infos.iter().find(|i| i.name == "first").unwrap();
    assert_eq!(first.dtype, ElementType::Float64);
    assert_eq!(first.shape, vec![2, 3]);

    let second = infos.iter().find(|i| i.name == "second").unwrap();
    assert_eq!(second.dtype, ElementType::Int32);
    assert_eq!(second.shape, vec![7]);
}

#[test]
fn test_list_empty_directory() {
    let dir = TempDir::new().unwrap();
    let host = host_in(&dir);
    assert!(host.list().unwrap().is_empty());
}
