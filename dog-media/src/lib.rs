//! # dog-media: Provider-agnostic media storage gateway
//!
//! `dog-media` gives DogRS applications one interface for storing media with a
//! remote provider: upload files, delete them, and resolve their public URLs,
//! one at a time or in batches that report a result per item.
//!
//! ## Key Features
//!
//! - **Streaming uploads**: In-memory buffers are piped into the provider's upload stream in chunks
//! - **Partial-failure batches**: `*_many` operations run concurrently and never fail because one item did
//! - **Bulk delete**: Providers that support it get one call per slice instead of one per id
//! - **Pluggable providers**: In-memory store out of the box, S3-compatible storage behind the `s3` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use dog_media::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> MediaResult<()> {
//! // 1. Resolve the configured provider
//! let config = MediaConfig::default().with_provider("memory");
//! let media = ProviderRegistry::builtin().resolve(&config).await?;
//!
//! // 2. Upload a file
//! let uploaded = media.upload(MediaFile::new("avatar.png", b"\x89PNG".to_vec())).await?;
//! assert!(uploaded.url.starts_with("https://"));
//!
//! // 3. Resolve and delete it again
//! let resolved = media.resolve_url(&uploaded.public_id).await?;
//! assert_eq!(resolved.url, uploaded.url);
//! media.delete(&uploaded.public_id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Your Service  │  ← Business logic only
//! ├─────────────────┤
//! │  MediaProvider  │  ← upload / delete / resolve, single and batch
//! ├─────────────────┤
//! │  MediaService   │  ← Streaming adapter + batch executor
//! ├─────────────────┤
//! │    MediaApi     │  ← Remote provider primitives
//! └─────────────────┘
//! ```

pub mod api;
pub mod batch;
mod channel;
mod config;
mod error;
mod memory;
mod provider;
mod registry;
#[cfg(feature = "s3")]
mod s3;
mod service;
mod settle;
mod types;
pub mod upload;

// Re-export main types for clean API
pub use api::{
    is_deleted_status, ApiCapabilities, BulkDeleteResponse, DestroyResponse, MediaApi,
    ResourceResponse, UploadCallback, UploadOptions, UploadResponse, UploadSink,
};
pub use batch::{classify_bulk_delete, fan_out};
pub use channel::{upload_channel, UploadReceiver};
pub use config::{MediaConfig, DEFAULT_CHUNK_SIZE, DEFAULT_DELIVERY_BASE_URL, DEFAULT_PROVIDER};
pub use error::{
    ApiError, FailureCause, MediaError, MediaErrorKind, MediaResult, BUFFER_EMPTY, DELETE_FAILED,
    NOT_FOUND_STATUS, NO_SECURE_URL, RESOLVE_FAILED, UPLOAD_FAILED,
};
pub use memory::{MemoryMediaApi, StoredMedia};
pub use provider::MediaProvider;
pub use registry::{ProviderFactory, ProviderKind, ProviderRegistry};
#[cfg(feature = "s3")]
pub use s3::{S3Config, S3MediaApi};
pub use service::MediaService;
pub use settle::{Outcome, Settle};
pub use types::{
    BatchResult, ByteStream, DeleteFailure, DeleteManyResult, DeleteSuccess, MediaFile,
    ResolveManyResult, ResourceType, UploadFailure, UploadManyResult, UploadSuccess, UrlFailure,
    UrlSuccess,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        MediaConfig, MediaError, MediaFile, MediaProvider, MediaResult, MediaService,
        ProviderRegistry, ResourceType, UploadSuccess, UrlSuccess,
    };
}
