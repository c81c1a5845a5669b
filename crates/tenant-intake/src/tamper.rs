//! On-read integrity verification: recompute a document's content hash and
//! flag divergence from the hash recorded at registration time.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `content`.
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Hex-encoded SHA-256 of `filename`, `size`, `mime`, and `user_id`, in that
/// order. Lets the registry detect a changed name/size/type/owner without
/// re-hashing the document body.
pub fn hash_metadata(filename: &str, size: u64, mime: Option<&str>, user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(size.to_le_bytes());
    hasher.update(mime.unwrap_or("").as_bytes());
    hasher.update(user_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether `content` still matches the hash recorded at registration.
pub fn verify(content: &[u8], recorded_hash: &str) -> bool {
    hash_content(content) == recorded_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_verifies() {
        let hash = hash_content(b"lease text");
        assert!(verify(b"lease text", &hash));
    }

    #[test]
    fn altered_content_fails_verification() {
        let hash = hash_content(b"lease text");
        assert!(!verify(b"tampered lease text", &hash));
    }

    #[test]
    fn metadata_hash_changes_with_any_field() {
        let base = hash_metadata("lease.pdf", 1024, Some("application/pdf"), "u1");
        assert_ne!(base, hash_metadata("other.pdf", 1024, Some("application/pdf"), "u1"));
        assert_ne!(base, hash_metadata("lease.pdf", 2048, Some("application/pdf"), "u1"));
        assert_ne!(base, hash_metadata("lease.pdf", 1024, None, "u1"));
        assert_ne!(base, hash_metadata("lease.pdf", 1024, Some("application/pdf"), "u2"));
    }
}
