//! Filesystem-backed evidence store. Images land under one directory keyed
//! by time-ordered UUID; the HTTP layer serves them read-only via ServeDir.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

/// Media types accepted as composting evidence, with the on-disk extension.
const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Clone)]
pub struct EvidenceStore {
    root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StoredEvidence {
    pub key: String,
    pub sha256: String,
    pub size_bytes: usize,
}

impl EvidenceStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create evidence dir: {e}")))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension_for(content_type: &str) -> Option<&'static str> {
        ALLOWED_CONTENT_TYPES
            .iter()
            .find(|(ct, _)| *ct == content_type)
            .map(|(_, ext)| *ext)
    }

    /// Persist one evidence image and return its key and SHA-256 checksum.
    /// Keys are UUIDv7 so directory listings follow upload order.
    pub async fn store(&self, content_type: &str, data: &Bytes) -> Result<StoredEvidence, AppError> {
        let ext = Self::extension_for(content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported evidence content type: {content_type}"))
        })?;

        let mut hasher = Sha256::new();
        hasher.update(data);
        let sha256 = hex::encode(hasher.finalize());

        let key = format!("{}.{ext}", Uuid::now_v7());
        tokio::fs::write(self.root.join(&key), data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write evidence {key}: {e}")))?;

        Ok(StoredEvidence {
            key,
            sha256,
            size_bytes: data.len(),
        })
    }
}
