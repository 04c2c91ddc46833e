use async_trait::async_trait;

use crate::{
    DeleteManyResult, MediaFile, MediaResult, ResolveManyResult, UploadManyResult, UploadSuccess,
    UrlSuccess,
};

/// Operations every media provider exposes to the host application.
///
/// Single-item calls succeed or fail outright. Batch calls report a result per
/// input and never fail because one item did; `delete_many` is the one
/// exception, failing as a whole when a bulk delete gets no status back at all.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Name the provider is registered under
    fn name(&self) -> &str;

    /// Upload one file
    async fn upload(&self, file: MediaFile) -> MediaResult<UploadSuccess>;

    /// Upload many files concurrently
    async fn upload_many(&self, files: Vec<MediaFile>) -> UploadManyResult;

    /// Delete one resource
    async fn delete(&self, public_id: &str) -> MediaResult<()>;

    /// Delete many resources
    async fn delete_many(&self, public_ids: Vec<String>) -> MediaResult<DeleteManyResult>;

    /// Resolve the public URL of one resource
    async fn resolve_url(&self, public_id: &str) -> MediaResult<UrlSuccess>;

    /// Resolve many public URLs concurrently
    async fn resolve_urls_many(&self, public_ids: Vec<String>) -> ResolveManyResult;
}
