//! Filesystem-backed artifact storage.
//!
//! Each request produces two artifacts: the uploaded input image and the
//! processed output image. Both are keyed by freshly generated UUIDv4
//! identifiers, so concurrent requests never collide and no coordination is
//! needed beyond the shared directories themselves.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Derive the stored input name from the uploaded file's name: a fresh UUID
/// plus the original extension (if any).
pub fn input_artifact_name(original_filename: &str) -> String {
    let id = Uuid::new_v4();
    match Path::new(original_filename).extension().and_then(OsStr::to_str) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Derive the stored output name: a fresh UUID with the fixed `.png`
/// extension of the output format.
pub fn output_artifact_name() -> String {
    format!("{}.png", Uuid::new_v4())
}

/// Handle on the upload and result directories.
///
/// Cheap to clone; holds no open file handles. Directories are created once
/// in [`ArtifactStore::open`] and assumed to exist afterwards.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    upload_dir: PathBuf,
    result_dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating both directories if absent.
    pub async fn open(upload_dir: impl Into<PathBuf>, result_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let upload_dir = upload_dir.into();
        let result_dir = result_dir.into();

        fs::create_dir_all(&upload_dir).await?;
        fs::create_dir_all(&result_dir).await?;

        Ok(Self { upload_dir, result_dir })
    }

    pub fn input_path(&self, name: &str) -> PathBuf {
        self.upload_dir.join(name)
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.result_dir.join(name)
    }

    pub async fn write_input(&self, name: &str, bytes: &[u8]) -> std::io::Result<()> {
        fs::write(self.input_path(name), bytes).await
    }

    pub async fn read_input(&self, name: &str) -> std::io::Result<Vec<u8>> {
        fs::read(self.input_path(name)).await
    }

    pub async fn write_output(&self, name: &str, bytes: &[u8]) -> std::io::Result<()> {
        fs::write(self.output_path(name), bytes).await
    }

    pub async fn read_output(&self, name: &str) -> std::io::Result<Vec<u8>> {
        fs::read(self.output_path(name)).await
    }

    /// Remove an artifact pair. Used by the delete-after-response retention
    /// policy. Both removals are attempted even if the first fails, so one
    /// stubborn file cannot strand its sibling; the first error is reported.
    pub async fn delete_pair(&self, input_name: &str, output_name: &str) -> std::io::Result<()> {
        let input = fs::remove_file(self.input_path(input_name)).await;
        let output = fs::remove_file(self.output_path(output_name)).await;
        input.and(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn temp_store() -> (ArtifactStore, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::open(dir.path().join("uploads"), dir.path().join("results"))
            .await
            .expect("store should open");
        (store, dir)
    }

    #[test]
    fn input_name_keeps_original_extension() {
        let name = input_artifact_name("photo.jpg");
        assert!(name.ends_with(".jpg"));
        // 36 chars of UUID plus ".jpg"
        assert_eq!(name.len(), 36 + 4);
    }

    #[test]
    fn input_name_without_extension_is_bare_uuid() {
        let name = input_artifact_name("photo");
        assert_eq!(name.len(), 36);
        assert!(Uuid::parse_str(&name).is_ok());
    }

    #[test]
    fn output_name_is_always_png() {
        assert!(output_artifact_name().ends_with(".png"));
    }

    #[test]
    fn generated_names_do_not_collide() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(input_artifact_name("photo.png")));
            assert!(seen.insert(output_artifact_name()));
        }
    }

    #[tokio::test]
    async fn open_creates_missing_directories() {
        let dir = TempDir::new().expect("temp dir");
        let uploads = dir.path().join("nested").join("uploads");
        let results = dir.path().join("nested").join("results");

        ArtifactStore::open(&uploads, &results).await.expect("store should open");

        assert!(uploads.is_dir());
        assert!(results.is_dir());
    }

    #[tokio::test]
    async fn input_round_trips_through_disk() {
        let (store, _dir) = temp_store().await;
        store.write_input("a.png", b"input bytes").await.unwrap();
        assert_eq!(store.read_input("a.png").await.unwrap(), b"input bytes");
    }

    #[tokio::test]
    async fn output_round_trips_through_disk() {
        let (store, _dir) = temp_store().await;
        store.write_output("b.png", b"output bytes").await.unwrap();
        assert_eq!(store.read_output("b.png").await.unwrap(), b"output bytes");
    }

    #[tokio::test]
    async fn delete_pair_removes_both_artifacts() {
        let (store, _dir) = temp_store().await;
        store.write_input("in.png", b"in").await.unwrap();
        store.write_output("out.png", b"out").await.unwrap();

        store.delete_pair("in.png", "out.png").await.unwrap();

        assert!(!store.input_path("in.png").exists());
        assert!(!store.output_path("out.png").exists());
    }

    #[tokio::test]
    async fn delete_pair_still_removes_output_when_input_is_gone() {
        let (store, _dir) = temp_store().await;
        store.write_output("out.png", b"out").await.unwrap();

        let result = store.delete_pair("never-written.png", "out.png").await;

        assert!(result.is_err());
        assert!(!store.output_path("out.png").exists());
    }
}
