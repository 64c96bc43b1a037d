//! File archive service.

use std::path::Path;
use std::sync::Arc;

use crate::client::ClientInner;
use crate::models::{AttributeSchema, Decoded, Method, Request};
use crate::Result;

const ARCHIVE_PATH: &str = "archive";

/// Service for storing and fetching files in the remote archive.
///
/// Uploads go out as `multipart/form-data`, replacements as a raw
/// `application/octet-stream` body. Downloads come back as
/// [`Decoded::Binary`].
///
/// # Example
///
/// ```no_run
/// # async fn example(client: ledgerlink::Client) -> ledgerlink::Result<()> {
/// let archive = client.archive();
///
/// let stored = archive.upload("receipts/2024-03.pdf", Some("inbox")).await?;
/// println!("{:?}", stored.tree());
///
/// let file = archive.download("8f3c1a").await?;
/// println!("{} bytes", file.bytes().map_or(0, |b| b.len()));
/// # Ok(())
/// # }
/// ```
pub struct ArchiveService {
    inner: Arc<ClientInner>,
    schema: AttributeSchema,
}

impl ArchiveService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self {
            inner,
            schema: AttributeSchema::default(),
        }
    }

    /// List the contents of a folder, or the root when `folder` is `None`.
    pub async fn folder(&self, folder: Option<&str>) -> Result<Decoded> {
        self.send(&Self::folder_request(folder)).await
    }

    /// Upload a local file into `folder`.
    pub async fn upload(&self, file: impl AsRef<Path>, folder: Option<&str>) -> Result<Decoded> {
        self.send(&Self::upload_request(file.as_ref(), folder)).await
    }

    /// Replace the content of archived file `id` with a local file.
    pub async fn replace(&self, id: &str, file: impl AsRef<Path>) -> Result<Decoded> {
        self.send(&Self::replace_request(id, file.as_ref())).await
    }

    /// Download archived file `id`.
    pub async fn download(&self, id: &str) -> Result<Decoded> {
        self.send(&Self::download_request(id)).await
    }

    /// Remove archived file `id`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let request = Request::builder(Method::Delete)
            .segments([ARCHIVE_PATH, id])
            .build();
        self.send(&request).await?;
        Ok(())
    }

    async fn send(&self, request: &Request) -> Result<Decoded> {
        self.inner.send(&self.schema, request, None).await
    }

    fn folder_request(folder: Option<&str>) -> Request {
        let mut builder = Request::builder(Method::Get).segment(ARCHIVE_PATH);
        if let Some(folder) = folder {
            builder = builder.query_param("path", folder);
        }
        builder.build()
    }

    fn upload_request(file: &Path, folder: Option<&str>) -> Request {
        let mut builder = Request::builder(Method::Post).segment(ARCHIVE_PATH).file(file);
        if let Some(folder) = folder {
            builder = builder.query_param("path", folder);
        }
        builder.build()
    }

    fn replace_request(id: &str, file: &Path) -> Request {
        Request::builder(Method::Put)
            .segments([ARCHIVE_PATH, id])
            .file(file)
            .build()
    }

    fn download_request(id: &str) -> Request {
        Request::builder(Method::Get)
            .segments([ARCHIVE_PATH, id])
            .accept("application/octet-stream")
            .build()
    }
}

impl std::fmt::Debug for ArchiveService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_targets_folder() {
        let request = ArchiveService::upload_request(Path::new("/tmp/r.pdf"), Some("inbox"));
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.path(), "archive");
        assert_eq!(request.query(), [("path".to_string(), "inbox".to_string())]);
        assert_eq!(request.file_path(), Some(Path::new("/tmp/r.pdf")));
    }

    #[test]
    fn test_replace_and_download() {
        let replace = ArchiveService::replace_request("abc", Path::new("r.pdf"));
        assert_eq!(replace.method(), Method::Put);
        assert_eq!(replace.path(), "archive/abc");

        let download = ArchiveService::download_request("abc");
        assert_eq!(download.accept(), Some("application/octet-stream"));
    }

    #[test]
    fn test_root_folder_has_no_query() {
        assert!(ArchiveService::folder_request(None).query().is_empty());
    }
}
