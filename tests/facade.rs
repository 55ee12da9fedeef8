//! End-to-end facade behavior that needs no model file or network:
//! name resolution order, error taxonomy, and cache isolation.

use seemore::{CheckpointCache, Device, Error, SeemoReUpscaler, MODEL_NAMES};
use tempfile::TempDir;

#[test]
fn unknown_model_fails_before_any_filesystem_access() {
    let base = TempDir::new().unwrap();
    let cache_dir = base.path().join("never-created");
    let cache = CheckpointCache::new(&cache_dir);

    let err = SeemoReUpscaler::with_cache("nonexistent_model", Device::Cpu, &cache).unwrap_err();
    match err {
        Error::UnknownModel { name, .. } => assert_eq!(name, "nonexistent_model"),
        other => panic!("Expected UnknownModel, got: {other}"),
    }

    // The lookup failed before the loader ran; the cache directory must
    // not have been created.
    assert!(!cache_dir.exists());
}

#[test]
fn unknown_model_error_lists_recognized_names() {
    let cache = CheckpointCache::new("/nonexistent");
    let err = SeemoReUpscaler::with_cache("seemore_b_x5", Device::Cpu, &cache).unwrap_err();
    let message = err.to_string();
    for name in MODEL_NAMES {
        assert!(message.contains(name), "missing {name} in: {message}");
    }
}

#[test]
fn unsupported_device_string_is_rejected() {
    let err = Device::parse("mps").unwrap_err();
    assert!(matches!(err, Error::DeviceUnavailable { .. }));
}

#[test]
fn empty_cache_dir_leaves_all_models_uncached() {
    let dir = TempDir::new().unwrap();
    let cache = CheckpointCache::new(dir.path());
    for name in MODEL_NAMES {
        let entry = seemore::registry::lookup(name).unwrap();
        assert!(!cache.is_cached(&entry));
    }
}
