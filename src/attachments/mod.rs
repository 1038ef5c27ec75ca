pub mod mime;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::AttachmentCategory;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Unsupported file type: {mime}")]
    UnsupportedType {
        mime: String,
        category: AttachmentCategory,
    },

    #[error("Invalid stored file name: {0}")]
    InvalidName(String),

    #[error("Attachment I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// File store for request attachments, rooted at `upload_dir`.
///
/// Files live at `<root>/<docs|img>/<uuid>.<ext>`. Only the file name is
/// recorded on the request row; the category is implied by the slot.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: AttachmentCategory) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Create both category directories
    pub async fn ensure_dirs(&self) -> Result<(), AttachmentError> {
        for category in [AttachmentCategory::Document, AttachmentCategory::Image] {
            tokio::fs::create_dir_all(self.category_dir(category)).await?;
        }
        Ok(())
    }

    /// Sniff, check against the category allow-list and write under a fresh
    /// random name. Returns the stored file name.
    pub async fn store(
        &self,
        category: AttachmentCategory,
        bytes: &[u8],
    ) -> Result<String, AttachmentError> {
        let detected = mime::detect(bytes);
        if !category.allowed_mime_types().contains(&detected.mime) {
            return Err(AttachmentError::UnsupportedType {
                mime: detected.mime.to_string(),
                category,
            });
        }

        let dir = self.category_dir(category);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", Uuid::new_v4(), detected.ext);
        tokio::fs::write(dir.join(&name), bytes).await?;
        debug!("Stored {} attachment {}", category.dir_name(), name);
        Ok(name)
    }

    pub async fn delete(&self, category: AttachmentCategory, name: &str) -> Result<(), AttachmentError> {
        let path = self.resolve(category, name)?;
        tokio::fs::remove_file(path).await?;
        debug!("Deleted {} attachment {}", category.dir_name(), name);
        Ok(())
    }

    /// Delete and log instead of failing; used after a commit or while
    /// unwinding an aborted create.
    pub async fn discard(&self, category: AttachmentCategory, name: &str) {
        if let Err(e) = self.delete(category, name).await {
            warn!("Failed to delete {} attachment {}: {}", category.dir_name(), name, e);
        }
    }

    /// Blocking variant of [`discard`](Self::discard) for drop paths, where
    /// no runtime can be awaited.
    pub fn discard_now(&self, category: AttachmentCategory, name: &str) {
        let removed = self
            .resolve(category, name)
            .and_then(|path| std::fs::remove_file(path).map_err(AttachmentError::from));
        if let Err(e) = removed {
            warn!("Failed to delete {} attachment {}: {}", category.dir_name(), name, e);
        }
    }

    pub fn resolve(&self, category: AttachmentCategory, name: &str) -> Result<PathBuf, AttachmentError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(AttachmentError::InvalidName(name.to_string()));
        }
        Ok(self.category_dir(category).join(name))
    }
}
