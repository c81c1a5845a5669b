#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-storage-fs** – A [`StorageProvider`] rooted at a local directory,
//! using `tokio::fs` throughout. Intended for self-hosted deployments and
//! for exercising the vault layer in tests without a network dependency.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use tenant_storage_core::{StorageError, StorageFile, StorageProvider, StorageResult};

/// A [`StorageProvider`] backed by a directory on the local filesystem.
/// All paths passed to trait methods are relative to `root` and are
/// rejected if they would escape it.
pub struct FsStorageProvider {
    root: PathBuf,
}

impl FsStorageProvider {
    /// Root the provider at `root`. The directory is not created here;
    /// callers should ensure it exists (or rely on the first
    /// `create_folder` call).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &str) -> StorageResult<PathBuf> {
        let relative = relative.trim_matches('/');
        let joined = self.root.join(relative);
        let normalized = normalize_lexically(&joined);
        if !normalized.starts_with(&self.root) {
            return Err(StorageError::Rejected(format!(
                "path escapes storage root: {relative}"
            )));
        }
        Ok(normalized)
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

async fn modified_at(path: &Path) -> DateTime<Utc> {
    match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(time) => DateTime::<Utc>::from(time),
        Err(_) => Utc::now(),
    }
}

fn io_err(path: &str, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Unavailable(format!("{path}: {err}"))
    }
}

#[async_trait]
impl StorageProvider for FsStorageProvider {
    fn provider_name(&self) -> &str {
        "local_fs"
    }

    async fn is_connected(&self) -> bool {
        tokio::fs::metadata(&self.root).await.is_ok()
    }

    async fn upload_file(
        &self,
        content: &[u8],
        destination_path: &str,
        filename: &str,
        _mime_type: Option<&str>,
    ) -> StorageResult<StorageFile> {
        let dir = self.resolve(destination_path)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_err(destination_path, e))?;
        let full_path = dir.join(filename);
        tokio::fs::write(&full_path, content)
            .await
            .map_err(|e| io_err(filename, e))?;

        let rel_path = format!("{}/{}", destination_path.trim_matches('/'), filename);
        Ok(StorageFile {
            id: None,
            name: filename.to_string(),
            path: rel_path,
            size: content.len() as u64,
            mime_type: _mime_type.map(str::to_string),
            modified_at: modified_at(&full_path).await,
            is_folder: false,
        })
    }

    async fn download_file(&self, file_path: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(file_path)?;
        tokio::fs::read(&path).await.map_err(|e| io_err(file_path, e))
    }

    async fn delete_file(&self, file_path: &str) -> StorageResult<bool> {
        let path = self.resolve(file_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(file_path, e)),
        }
    }

    async fn list_files(&self, folder_path: &str, recursive: bool) -> StorageResult<Vec<StorageFile>> {
        let dir = self.resolve(folder_path)?;
        let mut out = Vec::new();
        list_dir(&dir, &dir, recursive, &mut out).await?;
        Ok(out)
    }

    async fn file_exists(&self, file_path: &str) -> StorageResult<bool> {
        let path = self.resolve(file_path)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    async fn create_folder(&self, folder_path: &str) -> StorageResult<bool> {
        let path = self.resolve(folder_path)?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| io_err(folder_path, e))?;
        Ok(true)
    }
}

fn list_dir<'a>(
    base: &'a Path,
    current: &'a Path,
    recursive: bool,
    out: &'a mut Vec<StorageFile>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = StorageResult<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = match tokio::fs::read_dir(current).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_err(&current.display().to_string(), e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_err(&current.display().to_string(), e))?
        {
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let entry_path = entry.path();
            let rel = entry_path
                .strip_prefix(base)
                .unwrap_or(&entry_path)
                .to_string_lossy()
                .replace('\\', "/");
            let name = entry.file_name().to_string_lossy().to_string();

            if file_type.is_dir() {
                out.push(StorageFile {
                    id: None,
                    name,
                    path: rel,
                    size: 0,
                    mime_type: None,
                    modified_at: modified_at(&entry_path).await,
                    is_folder: true,
                });
                if recursive {
                    list_dir(base, &entry_path, recursive, out).await?;
                }
            } else {
                let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                out.push(StorageFile {
                    id: None,
                    name,
                    path: rel,
                    size,
                    mime_type: None,
                    modified_at: modified_at(&entry_path).await,
                    is_folder: false,
                });
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let dir = tempdir().unwrap();
        let provider = FsStorageProvider::new(dir.path());
        provider
            .upload_file(b"hello", "docs", "a.txt", Some("text/plain"))
            .await
            .unwrap();
        let bytes = provider.download_file("docs/a.txt").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn list_files_respects_recursion() {
        let dir = tempdir().unwrap();
        let provider = FsStorageProvider::new(dir.path());
        provider.upload_file(b"x", "a", "one.txt", None).await.unwrap();
        provider.upload_file(b"y", "a/b", "two.txt", None).await.unwrap();

        let shallow = provider.list_files("a", false).await.unwrap();
        assert_eq!(shallow.iter().filter(|f| !f.is_folder).count(), 1);

        let deep = provider.list_files("a", true).await.unwrap();
        assert_eq!(deep.iter().filter(|f| !f.is_folder).count(), 2);
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let dir = tempdir().unwrap();
        let provider = FsStorageProvider::new(dir.path());
        let result = provider.download_file("../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::NotFound(_)) | Err(StorageError::Rejected(_))));
    }

    #[tokio::test]
    async fn create_folder_is_idempotent() {
        let dir = tempdir().unwrap();
        let provider = FsStorageProvider::new(dir.path());
        assert!(provider.create_folder("vault/docs").await.unwrap());
        assert!(provider.create_folder("vault/docs").await.unwrap());
    }
}
