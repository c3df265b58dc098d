//! Drive facade: upload, download, folder creation and listing.

use std::path::{Component, Path};
use std::sync::Arc;

use cloudsheets_core::schema::DriveFile;

use crate::error::{Error, Result};
use crate::retry::RetryRunner;
use crate::transport::{DriveApi, Media};

/// Mime type the drive API uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveItemKind {
    File,
    Folder,
}

/// A file or folder as listed by [`DriveFacade::list`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    pub kind: DriveItemKind,
    pub mime_type: Option<String>,
    pub resource_key: Option<String>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.kind == DriveItemKind::Folder
    }

    fn from_file(file: DriveFile) -> Result<Self> {
        let id = file
            .id
            .ok_or_else(|| Error::InvalidResponse("file without an id".to_string()))?;
        let kind = if file.mime_type.as_deref() == Some(FOLDER_MIME_TYPE) {
            DriveItemKind::Folder
        } else {
            DriveItemKind::File
        };

        Ok(Self {
            id,
            name: file.name.unwrap_or_default(),
            kind,
            mime_type: file.mime_type,
            resource_key: file.resource_key,
        })
    }
}

/// High-level file operations.
#[derive(Clone)]
pub struct DriveFacade {
    api: Arc<dyn DriveApi>,
    runner: RetryRunner,
}

impl DriveFacade {
    pub fn new(api: Arc<dyn DriveApi>, runner: RetryRunner) -> Self {
        Self { api, runner }
    }

    /// Upload a local file into `folder_id` (the root folder when `None`),
    /// named after the file's base name.
    pub async fn upload(
        &self,
        folder_id: Option<&str>,
        file_path: &Path,
        mime_type: &str,
    ) -> Result<DriveItem> {
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no file name", file_path.display()),
                ))
            })?;

        let media = Media {
            mime_type: mime_type.to_string(),
            body: tokio::fs::read(file_path).await?,
        };
        let metadata = DriveFile {
            name: Some(name),
            parents: folder_id.map(str::to_string).into_iter().collect(),
            ..Default::default()
        };

        let created = self
            .runner
            .with_retry(
                || self.api.create_file(&metadata, Some(&media)),
                Error::is_retryable,
            )
            .await?;
        tracing::info!(id = ?created.id, bytes = media.body.len(), "Uploaded file");
        DriveItem::from_file(created)
    }

    /// Download `file_id` to `file_path`, returning the bytes written.
    pub async fn download(&self, file_id: &str, file_path: &Path) -> Result<u64> {
        self.runner
            .with_retry(
                || self.api.download_file(file_id, file_path),
                Error::is_retryable,
            )
            .await
    }

    /// Create every segment of `folder_path` as a chain of nested folders
    /// under `folder_id`.
    ///
    /// Returns the first (outermost) created folder, or `None` when the path
    /// has no segments. Existing folders of the same name are not reused.
    pub async fn mkdir(&self, folder_id: Option<&str>, folder_path: &str) -> Result<Option<DriveItem>> {
        let mut parent = folder_id.map(str::to_string);
        let mut first = None;

        for segment in path_segments(folder_path) {
            let metadata = DriveFile {
                name: Some(segment.clone()),
                mime_type: Some(FOLDER_MIME_TYPE.to_string()),
                parents: parent.iter().cloned().collect(),
                ..Default::default()
            };

            let created = self
                .runner
                .with_retry(|| self.api.create_file(&metadata, None), Error::is_retryable)
                .await?;
            let folder = DriveItem::from_file(created)?;
            tracing::debug!(id = %folder.id, name = %segment, "Created folder");

            parent = Some(folder.id.clone());
            if first.is_none() {
                first = Some(folder);
            }
        }

        Ok(first)
    }

    /// Direct children of `folder_id`.
    pub async fn list(&self, folder_id: &str) -> Result<Vec<DriveItem>> {
        let query = format!("'{}' in parents", escape_query(folder_id));
        let files = self
            .runner
            .with_retry(|| self.api.list_files(&query), Error::is_retryable)
            .await?;

        files.into_iter().map(DriveItem::from_file).collect()
    }
}

fn path_segments(path: &str) -> Vec<String> {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("a/b/c"), vec!["a", "b", "c"]);
        assert_eq!(path_segments("/a//b/"), vec!["a", "b"]);
        assert!(path_segments("").is_empty());
    }

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("abc"), "abc");
        assert_eq!(escape_query("it's"), "it\\'s");
    }

    #[test]
    fn test_item_kind() {
        let folder = DriveItem::from_file(DriveFile {
            id: Some("1".into()),
            name: Some("reports".into()),
            mime_type: Some(FOLDER_MIME_TYPE.into()),
            ..Default::default()
        })
        .unwrap();
        assert!(folder.is_folder());

        let file = DriveItem::from_file(DriveFile {
            id: Some("2".into()),
            mime_type: Some("text/csv".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(file.kind, DriveItemKind::File);
        assert_eq!(file.name, "");

        assert!(DriveItem::from_file(DriveFile::default()).is_err());
    }
}
