#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-storage-core** – The [`StorageProvider`] abstraction every vault
//! backend implements, plus the `.semptify` vault-folder convention layered
//! on top of it as default trait methods.
//!
//! Grounded on `app/services/storage/base.py`'s `StorageProvider` ABC.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry returned by [`StorageProvider::list_files`] or produced by an
/// upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageFile {
    /// Provider-assigned identifier, when the backend has one.
    pub id: Option<String>,
    /// Base filename, no directory component.
    pub name: String,
    /// Full path relative to the provider's root.
    pub path: String,
    /// Size in bytes. `0` for folders.
    pub size: u64,
    /// MIME type, when known.
    pub mime_type: Option<String>,
    /// Last-modified timestamp.
    pub modified_at: DateTime<Utc>,
    /// Whether this entry is a folder rather than a file.
    pub is_folder: bool,
}

/// A stored, encrypted provider auth token, as written under
/// `.semptify/auth_token.enc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageToken {
    /// Hash of the token, used to detect changes without decrypting.
    pub token_hash: String,
    /// The user this token was issued for.
    pub user_id: String,
    /// The role the token was issued under.
    pub role: String,
    /// When the token was written.
    pub created_at: DateTime<Utc>,
    /// The storage provider name this token authenticates against.
    pub provider: String,
    /// The encrypted token bytes, base64-encoded for transport.
    pub encrypted_token: String,
}

/// Failure modes a [`StorageProvider`] can report. Distinct from
/// `tenant_types::TenantError` so backends can be tested in isolation;
/// callers at the vault layer fold this into `TenantError::StorageUnavailable`
/// or `TenantError::NotFound` as appropriate.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested path does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend is unreachable or returned a transport-level failure.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    /// The backend rejected the operation (permissions, quota, invalid path).
    #[error("storage operation rejected: {0}")]
    Rejected(String),
}

/// A result type over [`StorageError`].
pub type StorageResult<T> = Result<T, StorageError>;

/// The vault folder every provider keeps its auth token and documents under,
/// relative to the provider's root.
pub const SEMPTIFY_FOLDER: &str = ".semptify";
/// Filename the encrypted provider auth token is written to, inside
/// [`SEMPTIFY_FOLDER`].
pub const TOKEN_FILE: &str = "auth_token.enc";

/// A connected cloud or local storage backend, addressed by path.
///
/// Implementors provide the six core operations; the `.semptify`
/// vault-folder convention (auth token persistence, document namespacing) is
/// layered on top as default methods so every backend gets it for free.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Stable name identifying this backend (`"dropbox"`, `"local_fs"`, ...).
    fn provider_name(&self) -> &str;

    /// Whether the backend is currently reachable and authenticated.
    async fn is_connected(&self) -> bool;

    /// Write `content` to `destination_path/filename`, creating intermediate
    /// folders as needed. Returns the resulting file's metadata.
    async fn upload_file(
        &self,
        content: &[u8],
        destination_path: &str,
        filename: &str,
        mime_type: Option<&str>,
    ) -> StorageResult<StorageFile>;

    /// Read the full contents of `file_path`.
    async fn download_file(&self, file_path: &str) -> StorageResult<Vec<u8>>;

    /// Delete `file_path`. Returns `true` if something was deleted, `false`
    /// if the path did not exist.
    async fn delete_file(&self, file_path: &str) -> StorageResult<bool>;

    /// List the contents of `folder_path`, optionally recursing into
    /// subfolders.
    async fn list_files(&self, folder_path: &str, recursive: bool) -> StorageResult<Vec<StorageFile>>;

    /// Whether `file_path` currently exists.
    async fn file_exists(&self, file_path: &str) -> StorageResult<bool>;

    /// Create `folder_path`, including intermediate folders. Idempotent: an
    /// already-existing folder is not an error.
    async fn create_folder(&self, folder_path: &str) -> StorageResult<bool>;

    /// Ensure `.semptify` exists at the provider root. Idempotent.
    async fn ensure_semptify_folder(&self) -> StorageResult<()> {
        self.create_folder(SEMPTIFY_FOLDER).await?;
        Ok(())
    }

    /// Persist `token` under `.semptify/auth_token.enc`, overwriting any
    /// existing token.
    async fn write_auth_token(&self, token: &StorageToken) -> StorageResult<()> {
        self.ensure_semptify_folder().await?;
        let bytes = serde_json::to_vec(token)
            .map_err(|e| StorageError::Rejected(format!("token serialization failed: {e}")))?;
        self.upload_file(&bytes, SEMPTIFY_FOLDER, TOKEN_FILE, Some("application/octet-stream"))
            .await?;
        Ok(())
    }

    /// Read back the token written by [`Self::write_auth_token`], if any.
    async fn read_auth_token(&self) -> StorageResult<Option<StorageToken>> {
        let path = format!("{SEMPTIFY_FOLDER}/{TOKEN_FILE}");
        if !self.file_exists(&path).await? {
            return Ok(None);
        }
        let bytes = self.download_file(&path).await?;
        let token = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Rejected(format!("token deserialization failed: {e}")))?;
        Ok(Some(token))
    }

    /// Whether an auth token has been persisted for this provider.
    async fn token_exists(&self) -> StorageResult<bool> {
        let path = format!("{SEMPTIFY_FOLDER}/{TOKEN_FILE}");
        self.file_exists(&path).await
    }

    /// Upload a vault document, namespaced by `document_type` under
    /// `.semptify/vault/{document_type}/`. Untyped documents land directly
    /// under `.semptify/vault/`.
    async fn upload_document(
        &self,
        content: &[u8],
        filename: &str,
        document_type: Option<&str>,
        mime_type: Option<&str>,
    ) -> StorageResult<StorageFile> {
        let folder = match document_type {
            Some(doc_type) => format!("{SEMPTIFY_FOLDER}/vault/{doc_type}"),
            None => format!("{SEMPTIFY_FOLDER}/vault"),
        };
        self.create_folder(&folder).await?;
        self.upload_file(content, &folder, filename, mime_type).await
    }

    /// List vault documents, optionally filtered to one `document_type`.
    async fn list_documents(&self, document_type: Option<&str>) -> StorageResult<Vec<StorageFile>> {
        let folder = match document_type {
            Some(doc_type) => format!("{SEMPTIFY_FOLDER}/vault/{doc_type}"),
            None => format!("{SEMPTIFY_FOLDER}/vault"),
        };
        match self.list_files(&folder, document_type.is_none()).await {
            Ok(files) => Ok(files),
            Err(StorageError::NotFound(_)) => Ok(Vec::new()),
            Err(other) => Err(other),
        }
    }
}
