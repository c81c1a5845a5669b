#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-storage-memory** – An in-process [`StorageProvider`] backed by a
//! `DashMap`. Used by tests and local development; never persists past
//! process exit.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use tenant_storage_core::{StorageError, StorageFile, StorageProvider, StorageResult};

#[derive(Clone)]
struct Entry {
    content: Vec<u8>,
    mime_type: Option<String>,
    is_folder: bool,
    modified_at: chrono::DateTime<Utc>,
}

/// An in-memory [`StorageProvider`]. Cheap to construct; share via `Arc`
/// across tasks that need to see each other's writes.
#[derive(Default)]
pub struct MemoryStorageProvider {
    entries: DashMap<String, Entry>,
}

impl MemoryStorageProvider {
    /// A fresh, empty provider.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn join(folder: &str, filename: &str) -> String {
    let folder = normalize(folder);
    if folder.is_empty() {
        filename.to_string()
    } else {
        format!("{folder}/{filename}")
    }
}

fn to_storage_file(path: &str, entry: &Entry) -> StorageFile {
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    StorageFile {
        id: None,
        name,
        path: path.to_string(),
        size: entry.content.len() as u64,
        mime_type: entry.mime_type.clone(),
        modified_at: entry.modified_at,
        is_folder: entry.is_folder,
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_name(&self) -> &str {
        "memory"
    }

    async fn is_connected(&self) -> bool {
        true
    }

    async fn upload_file(
        &self,
        content: &[u8],
        destination_path: &str,
        filename: &str,
        mime_type: Option<&str>,
    ) -> StorageResult<StorageFile> {
        let path = join(destination_path, filename);
        let entry = Entry {
            content: content.to_vec(),
            mime_type: mime_type.map(str::to_string),
            is_folder: false,
            modified_at: Utc::now(),
        };
        self.entries.insert(path.clone(), entry.clone());
        Ok(to_storage_file(&path, &entry))
    }

    async fn download_file(&self, file_path: &str) -> StorageResult<Vec<u8>> {
        let path = normalize(file_path);
        self.entries
            .get(&path)
            .filter(|e| !e.is_folder)
            .map(|e| e.content.clone())
            .ok_or_else(|| StorageError::NotFound(file_path.to_string()))
    }

    async fn delete_file(&self, file_path: &str) -> StorageResult<bool> {
        let path = normalize(file_path);
        Ok(self.entries.remove(&path).is_some())
    }

    async fn list_files(&self, folder_path: &str, recursive: bool) -> StorageResult<Vec<StorageFile>> {
        let prefix = normalize(folder_path);
        let mut out = Vec::new();
        for item in self.entries.iter() {
            let path = item.key();
            let rest = if prefix.is_empty() {
                Some(path.as_str())
            } else {
                path.strip_prefix(&prefix).and_then(|r| r.strip_prefix('/'))
            };
            let Some(rest) = rest else { continue };
            if rest.is_empty() {
                continue;
            }
            if !recursive && rest.contains('/') {
                continue;
            }
            out.push(to_storage_file(path, item.value()));
        }
        Ok(out)
    }

    async fn file_exists(&self, file_path: &str) -> StorageResult<bool> {
        let path = normalize(file_path);
        Ok(self.entries.contains_key(&path))
    }

    async fn create_folder(&self, folder_path: &str) -> StorageResult<bool> {
        let path = normalize(folder_path);
        if self.entries.contains_key(&path) {
            return Ok(true);
        }
        self.entries.insert(
            path,
            Entry {
                content: Vec::new(),
                mime_type: None,
                is_folder: true,
                modified_at: Utc::now(),
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let provider = MemoryStorageProvider::new();
        provider
            .upload_file(b"hello", "docs", "a.txt", Some("text/plain"))
            .await
            .unwrap();
        let bytes = provider.download_file("docs/a.txt").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn list_files_respects_recursion() {
        let provider = MemoryStorageProvider::new();
        provider.upload_file(b"x", "a", "one.txt", None).await.unwrap();
        provider.upload_file(b"y", "a/b", "two.txt", None).await.unwrap();

        let shallow = provider.list_files("a", false).await.unwrap();
        assert_eq!(shallow.len(), 1);

        let deep = provider.list_files("a", true).await.unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[tokio::test]
    async fn semptify_folder_round_trips_a_token() {
        let provider = MemoryStorageProvider::new();
        let token = tenant_storage_core::StorageToken {
            token_hash: "h".into(),
            user_id: "u1".into(),
            role: "user".into(),
            created_at: Utc::now(),
            provider: "memory".into(),
            encrypted_token: "ciphertext".into(),
        };
        provider.write_auth_token(&token).await.unwrap();
        assert!(provider.token_exists().await.unwrap());
        let read_back = provider.read_auth_token().await.unwrap().unwrap();
        assert_eq!(read_back.token_hash, "h");
    }

    #[tokio::test]
    async fn delete_missing_file_returns_false() {
        let provider = MemoryStorageProvider::new();
        assert!(!provider.delete_file("nope.txt").await.unwrap());
    }
}
