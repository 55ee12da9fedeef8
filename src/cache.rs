//! On-disk checkpoint cache: resolve, download, and verify model weights.
//!
//! The cache directory is the only persisted state in the system. Its
//! location is an explicit constructor argument so tests can inject a
//! temp directory; [`CheckpointCache::default_dir`] honors the
//! `SEEMORE_CACHE_DIR` environment variable.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::registry::ModelEntry;

/// Environment variable overriding the default cache directory.
pub const ENV_CACHE_DIR: &str = "SEEMORE_CACHE_DIR";

const DEFAULT_CACHE_DIR_NAME: &str = "models";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Local directory of downloaded checkpoint files, keyed by filename.
pub struct CheckpointCache {
    dir: PathBuf,
}

impl CheckpointCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$SEEMORE_CACHE_DIR` when set, otherwise `models/` relative to
    /// the working directory.
    pub fn default_dir() -> PathBuf {
        std::env::var_os(ENV_CACHE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint_path(&self, entry: &ModelEntry) -> PathBuf {
        self.dir.join(&entry.filename)
    }

    pub fn is_cached(&self, entry: &ModelEntry) -> bool {
        self.checkpoint_path(entry).is_file()
    }

    /// Return the local checkpoint path, downloading it first if absent.
    ///
    /// Exactly one fetch attempt is made; retry is left to the caller.
    pub fn ensure(&self, entry: &ModelEntry) -> Result<PathBuf> {
        let final_path = self.checkpoint_path(entry);
        if final_path.is_file() {
            return Ok(final_path);
        }
        self.download(entry)
    }

    fn download(&self, entry: &ModelEntry) -> Result<PathBuf> {
        let name = &entry.name;
        let url = entry
            .url
            .as_deref()
            .ok_or_else(|| Error::checkpoint(name, "no download URL configured"))?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::checkpoint(
                name,
                format!("cannot create cache directory {}: {e}", self.dir.display()),
            )
        })?;

        let final_path = self.checkpoint_path(entry);
        let tmp_path = self.dir.join(format!("{}.part", entry.filename));

        info!(model = %name, url = %url, "Downloading checkpoint");

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| Error::checkpoint(name, format!("cannot build HTTP client: {e}")))?;

        let mut response = client
            .get(url)
            .send()
            .map_err(|e| Error::checkpoint(name, format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::checkpoint(
                name,
                format!("download returned HTTP {}", response.status().as_u16()),
            ));
        }

        let mut tmp_file = fs::File::create(&tmp_path).map_err(|e| {
            Error::checkpoint(
                name,
                format!("cannot create temp file {}: {e}", tmp_path.display()),
            )
        })?;

        if let Err(e) = response.copy_to(&mut tmp_file) {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::checkpoint(
                name,
                format!("download from {url} failed: {e}"),
            ));
        }

        if let Err(e) = tmp_file.sync_all() {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::checkpoint(
                name,
                format!("cannot flush temp file {}: {e}", tmp_path.display()),
            ));
        }
        drop(tmp_file);

        if let Some(expected) = &entry.sha256 {
            info!(model = %name, "Verifying SHA256 checksum");
            if let Err(e) = verify_checksum(&tmp_path, expected) {
                let _ = fs::remove_file(&tmp_path);
                return Err(Error::checkpoint(name, e));
            }
            info!(model = %name, "Checksum verified OK");
        } else {
            warn!(model = %name, "No SHA256 checksum configured, skipping verification");
        }

        fs::rename(&tmp_path, &final_path).map_err(|e| {
            Error::checkpoint(
                name,
                format!(
                    "cannot move {} to {}: {e}",
                    tmp_path.display(),
                    final_path.display()
                ),
            )
        })?;

        info!(model = %name, path = %final_path.display(), "Download complete");
        Ok(final_path)
    }
}

fn verify_checksum(path: &Path, expected: &str) -> std::result::Result<(), String> {
    let actual = sha256_file(path).map_err(|e| format!("cannot hash {}: {e}", path.display()))?;
    if actual != expected {
        return Err(format!(
            "SHA256 mismatch: expected {expected}, got {actual}"
        ));
    }
    Ok(())
}

fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.write_all(&buf[..n])?;
    }
    let hash = hasher.finalize();
    Ok(format!("{hash:x}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::lookup;
    use tempfile::TempDir;

    fn entry_with(url: Option<&str>, sha256: Option<&str>) -> ModelEntry {
        let mut entry = lookup("seemore_t_x2").unwrap();
        entry.url = url.map(String::from);
        entry.sha256 = sha256.map(String::from);
        entry
    }

    #[test]
    fn test_checkpoint_path() {
        let cache = CheckpointCache::new("/tmp/seemore-cache");
        let entry = lookup("seemore_b_x4").unwrap();
        assert_eq!(
            cache.checkpoint_path(&entry),
            PathBuf::from("/tmp/seemore-cache/seemore_b_x4.onnx")
        );
    }

    #[test]
    fn test_is_cached_false() {
        let dir = TempDir::new().unwrap();
        let cache = CheckpointCache::new(dir.path());
        let entry = lookup("seemore_b_x2").unwrap();
        assert!(!cache.is_cached(&entry));
    }

    #[test]
    fn test_is_cached_true() {
        let dir = TempDir::new().unwrap();
        let entry = lookup("seemore_b_x2").unwrap();
        fs::write(dir.path().join(&entry.filename), b"fake weights").unwrap();
        let cache = CheckpointCache::new(dir.path());
        assert!(cache.is_cached(&entry));
    }

    #[test]
    fn test_ensure_returns_cached_path_without_fetch() {
        let dir = TempDir::new().unwrap();
        // URL is unset; ensure must still succeed because the file exists.
        let entry = entry_with(None, None);
        let path = dir.path().join(&entry.filename);
        fs::write(&path, b"fake weights").unwrap();

        let cache = CheckpointCache::new(dir.path());
        assert_eq!(cache.ensure(&entry).unwrap(), path);
    }

    #[test]
    fn test_ensure_no_url() {
        let dir = TempDir::new().unwrap();
        let cache = CheckpointCache::new(dir.path());
        let entry = entry_with(None, None);
        let err = cache.ensure(&entry).unwrap_err();
        match err {
            Error::CheckpointUnavailable { model, reason } => {
                assert_eq!(model, "seemore_t_x2");
                assert!(reason.contains("no download URL"));
            }
            other => panic!("Expected CheckpointUnavailable, got: {other}"),
        }
    }

    #[test]
    fn test_ensure_bad_scheme_fails_without_partial_file() {
        let dir = TempDir::new().unwrap();
        let cache = CheckpointCache::new(dir.path());
        let entry = entry_with(Some("file:///nonexistent.onnx"), None);
        let err = cache.ensure(&entry).unwrap_err();
        assert!(matches!(err, Error::CheckpointUnavailable { .. }));
        assert!(!dir.path().join(format!("{}.part", entry.filename)).exists());
        assert!(!cache.is_cached(&entry));
    }

    #[test]
    fn test_sha256_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.bin");
        fs::write(&path, b"hello world").unwrap();
        let hash = sha256_file(&path).unwrap();
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_verify_checksum_match() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.bin");
        fs::write(&path, b"hello world").unwrap();
        verify_checksum(
            &path,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        )
        .unwrap();
    }

    #[test]
    fn test_verify_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.bin");
        fs::write(&path, b"tampered").unwrap();
        let err = verify_checksum(&path, "deadbeef").unwrap_err();
        assert!(err.contains("SHA256 mismatch"));
    }

    #[test]
    fn test_default_dir_env_override() {
        // Env mutation is process-global; keep this the only test touching it.
        std::env::set_var(ENV_CACHE_DIR, "/tmp/seemore-env-cache");
        assert_eq!(
            CheckpointCache::default_dir(),
            PathBuf::from("/tmp/seemore-env-cache")
        );
        std::env::remove_var(ENV_CACHE_DIR);
        assert_eq!(
            CheckpointCache::default_dir(),
            PathBuf::from(DEFAULT_CACHE_DIR_NAME)
        );
    }

    /// Requires network access. Run: `cargo test -- --ignored`
    #[test]
    #[ignore]
    fn test_download_real() {
        let dir = TempDir::new().unwrap();
        let cache = CheckpointCache::new(dir.path());
        let entry = lookup("seemore_t_x2").unwrap();
        let path = cache.ensure(&entry).unwrap();
        assert!(path.is_file());
        let meta = fs::metadata(&path).unwrap();
        assert!(meta.len() > 100_000, "Downloaded checkpoint is too small");
    }
}
