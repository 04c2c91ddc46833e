use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Sink;

use crate::{ApiError, ResourceType};

/// Write side of a provider upload; closing it tells the provider the payload is complete
pub type UploadSink = Pin<Box<dyn Sink<Bytes, Error = ApiError> + Send>>;

/// Completion callback the provider invokes once it has consumed the upload
pub type UploadCallback = Box<dyn FnOnce(Result<UploadResponse, ApiError>) + Send + 'static>;

/// Remote media API binding - implemented once per concrete provider
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// Open a streaming upload.
    ///
    /// Bytes are written into the returned sink; the provider reports the outcome
    /// through `callback`, normally after the sink is closed.
    fn upload_stream(&self, options: UploadOptions, callback: UploadCallback) -> UploadSink;

    /// Delete one resource
    async fn destroy(&self, public_id: &str) -> Result<DestroyResponse, ApiError>;

    /// Delete many resources in one call, reporting a status per id
    async fn delete_resources(&self, _public_ids: &[String]) -> Result<BulkDeleteResponse, ApiError> {
        Err(ApiError::Unsupported)
    }

    /// Look up a single resource
    async fn resource(&self, public_id: &str) -> Result<ResourceResponse, ApiError>;

    /// Get provider capabilities
    fn capabilities(&self) -> ApiCapabilities;
}

/// Options passed to the provider when opening an upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub resource_type: ResourceType,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl UploadOptions {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            ..Self::default()
        }
    }

    pub fn with_file_name<S: Into<String>>(mut self, file_name: S) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// What the provider reports once an upload is consumed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadResponse {
    pub public_id: Option<String>,
    pub secure_url: Option<String>,
    pub bytes: Option<u64>,
}

/// Result of a single delete call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyResponse {
    pub result: String,
}

impl DestroyResponse {
    pub fn new<S: Into<String>>(result: S) -> Self {
        Self {
            result: result.into(),
        }
    }
}

/// Result of a bulk delete call: status per requested id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteResponse {
    pub deleted: HashMap<String, String>,
    pub partial: bool,
}

/// Result of a resource lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    pub public_id: String,
    pub secure_url: Option<String>,
}

/// Provider capabilities
#[derive(Debug, Clone, Default)]
pub struct ApiCapabilities {
    pub bulk_delete: bool,
    pub max_bulk_delete: Option<usize>,
}

impl ApiCapabilities {
    pub fn basic() -> Self {
        Self {
            bulk_delete: false,
            max_bulk_delete: None,
        }
    }

    pub fn with_bulk_delete(mut self, max_ids: Option<usize>) -> Self {
        self.bulk_delete = true;
        self.max_bulk_delete = max_ids;
        self
    }
}

/// Statuses a provider uses to confirm a resource is gone
pub fn is_deleted_status(status: &str) -> bool {
    matches!(status, "ok" | "deleted")
}
