//! Filesystem area holding uploaded bytes, served under `/uploads`.

use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tokio::fs;
use uuid::Uuid;

/// Public URL prefix of stored blobs.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const ALLOWED_CONTENT_TYPES: [&str; 10] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

/// A stored blob: generated file name and the URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub stored_name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under a fresh unique name keeping the original extension.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<StoredBlob> {
        fs::create_dir_all(&self.root).await?;
        let stored_name = match extension_of(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        fs::write(self.root.join(&stored_name), bytes).await?;
        info!("Stored blob {} ({} bytes)", stored_name, bytes.len());
        Ok(StoredBlob {
            url: format!("{}/{}", UPLOADS_URL_PREFIX, stored_name),
            stored_name,
        })
    }

    /// Reads a stored blob by its generated name.
    pub async fn read(&self, stored_name: &str) -> io::Result<Vec<u8>> {
        if !is_plain_file_name(stored_name) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a plain file name"));
        }
        fs::read(self.root.join(stored_name)).await
    }

    /// Deletes the blob behind `url`. Failures are logged, never returned.
    pub async fn remove_best_effort(&self, url: &str) {
        let Some(name) = stored_name_from_url(url) else {
            warn!("Not a blob url, nothing removed: {}", url);
            return;
        };
        if let Err(e) = fs::remove_file(self.root.join(name)).await {
            warn!("Could not delete blob {}: {}", name, e);
        }
    }
}

/// Lower-cased alphanumeric extension of a client-supplied file name.
fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extracts the stored name from `/uploads/<name>`, rejecting anything that
/// could escape the blob area.
pub fn stored_name_from_url(url: &str) -> Option<&str> {
    let name = url.strip_prefix(UPLOADS_URL_PREFIX)?.strip_prefix('/')?;
    is_plain_file_name(name).then_some(name)
}

pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_safe_extensions() {
        assert_eq!(extension_of("report.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("x.p/h"), None);
    }

    #[test]
    fn url_names_cannot_escape() {
        assert_eq!(stored_name_from_url("/uploads/abc.png"), Some("abc.png"));
        assert_eq!(stored_name_from_url("/uploads/../secret"), None);
        assert_eq!(stored_name_from_url("/elsewhere/abc.png"), None);
        assert_eq!(stored_name_from_url("/uploads/.."), None);
    }

    #[test]
    fn allow_list_matches_exact_types() {
        assert!(is_allowed_content_type("image/png"));
        assert!(is_allowed_content_type("application/pdf"));
        assert!(!is_allowed_content_type("application/zip"));
        assert!(!is_allowed_content_type("image/svg+xml"));
    }

    #[tokio::test]
    async fn save_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path().join("uploads"));

        let stored = blobs.save("notes.txt", b"hello").await.unwrap();
        assert!(stored.stored_name.ends_with(".txt"));
        assert_eq!(stored.url, format!("/uploads/{}", stored.stored_name));
        let path = blobs.root().join(&stored.stored_name);
        assert_eq!(blobs.read(&stored.stored_name).await.unwrap(), b"hello");
        assert!(blobs.read("../escape").await.is_err());

        blobs.remove_best_effort(&stored.url).await;
        assert!(!path.exists());
        // a second removal only logs
        blobs.remove_best_effort(&stored.url).await;
    }
}
