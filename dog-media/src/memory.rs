use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::channel::upload_channel;
use crate::{
    ApiCapabilities, ApiError, BulkDeleteResponse, DestroyResponse, MediaApi, MediaConfig,
    ResourceResponse, ResourceType, UploadCallback, UploadOptions, UploadResponse, UploadSink,
    NOT_FOUND_STATUS,
};

const CHANNEL_CAPACITY: usize = 16;
const MAX_BULK_DELETE: usize = 100;

/// A media object held by [`MemoryMediaApi`]
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub public_id: String,
    pub resource_type: ResourceType,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub secure_url: String,
    pub bytes: Bytes,
}

/// In-process media provider.
///
/// Uploads are drained by a background task and reported through the
/// completion callback, the same way a remote provider answers.
#[derive(Clone)]
pub struct MemoryMediaApi {
    objects: Arc<RwLock<HashMap<String, StoredMedia>>>,
    base_url: String,
}

impl MemoryMediaApi {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            base_url: config.delivery_root().to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.objects.read().contains_key(public_id)
    }

    pub fn get(&self, public_id: &str) -> Option<StoredMedia> {
        self.objects.read().get(public_id).cloned()
    }

    fn url_for(&self, resource_type: ResourceType, public_id: &str) -> String {
        format!("{}/{}/upload/{}", self.base_url, resource_type, public_id)
    }
}

impl Default for MemoryMediaApi {
    fn default() -> Self {
        Self::new(&MediaConfig::default())
    }
}

#[async_trait]
impl MediaApi for MemoryMediaApi {
    fn upload_stream(&self, options: UploadOptions, callback: UploadCallback) -> UploadSink {
        let (sink, receiver) = upload_channel(CHANNEL_CAPACITY);
        let public_id = format!("media_{}", Uuid::new_v4().simple());
        let secure_url = self.url_for(options.resource_type, &public_id);
        let objects = self.objects.clone();

        tokio::spawn(async move {
            match receiver.collect().await {
                Ok(bytes) => {
                    let size = bytes.len() as u64;
                    objects.write().insert(
                        public_id.clone(),
                        StoredMedia {
                            public_id: public_id.clone(),
                            resource_type: options.resource_type,
                            file_name: options.file_name,
                            content_type: options.content_type,
                            secure_url: secure_url.clone(),
                            bytes,
                        },
                    );
                    debug!(%public_id, size, "Stored media in memory");
                    callback(Ok(UploadResponse {
                        public_id: Some(public_id),
                        secure_url: Some(secure_url),
                        bytes: Some(size),
                    }));
                }
                Err(err) => callback(Err(err)),
            }
        });

        sink
    }

    async fn destroy(&self, public_id: &str) -> Result<DestroyResponse, ApiError> {
        let removed = self.objects.write().remove(public_id);
        Ok(DestroyResponse::new(match removed {
            Some(_) => "ok",
            None => NOT_FOUND_STATUS,
        }))
    }

    async fn delete_resources(&self, public_ids: &[String]) -> Result<BulkDeleteResponse, ApiError> {
        if public_ids.len() > MAX_BULK_DELETE {
            return Err(ApiError::rejected(format!(
                "bulk delete accepts at most {} ids",
                MAX_BULK_DELETE
            )));
        }

        let mut objects = self.objects.write();
        let deleted = public_ids
            .iter()
            .map(|id| {
                let status = match objects.remove(id) {
                    Some(_) => "deleted",
                    None => NOT_FOUND_STATUS,
                };
                (id.clone(), status.to_string())
            })
            .collect();

        Ok(BulkDeleteResponse {
            deleted,
            partial: false,
        })
    }

    async fn resource(&self, public_id: &str) -> Result<ResourceResponse, ApiError> {
        self.objects
            .read()
            .get(public_id)
            .map(|stored| ResourceResponse {
                public_id: stored.public_id.clone(),
                secure_url: Some(stored.secure_url.clone()),
            })
            .ok_or_else(|| ApiError::NotFound(public_id.to_string()))
    }

    fn capabilities(&self) -> ApiCapabilities {
        ApiCapabilities::basic().with_bulk_delete(Some(MAX_BULK_DELETE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MediaFile, MediaProvider, MediaService};

    fn service() -> (MemoryMediaApi, MediaService) {
        let config = MediaConfig::default().with_chunk_size(4);
        let api = MemoryMediaApi::new(&config);
        let service = MediaService::from_shared(Arc::new(api.clone()), config);
        (api, service)
    }

    #[tokio::test]
    async fn stores_streamed_bytes_intact() {
        let (api, service) = service();

        let uploaded = service
            .upload(MediaFile::new("cat.png", b"0123456789".to_vec()).with_content_type("image/png"))
            .await
            .unwrap();

        let stored = api.get(&uploaded.public_id).unwrap();
        assert_eq!(stored.bytes, Bytes::from_static(b"0123456789"));
        assert_eq!(stored.file_name.as_deref(), Some("cat.png"));
        assert_eq!(stored.content_type.as_deref(), Some("image/png"));
        assert_eq!(uploaded.url, stored.secure_url);
        assert!(uploaded.url.starts_with("https://media.local/image/upload/media_"));
    }

    #[tokio::test]
    async fn destroy_reports_missing_ids() {
        let (api, _service) = service();
        assert_eq!(api.destroy("nope").await.unwrap().result, NOT_FOUND_STATUS);
    }

    #[tokio::test]
    async fn bulk_delete_limit_is_enforced() {
        let (api, _service) = service();
        let ids: Vec<String> = (0..=MAX_BULK_DELETE).map(|i| i.to_string()).collect();
        assert!(api.delete_resources(&ids).await.is_err());
    }

    #[tokio::test]
    async fn delete_many_splits_large_batches() {
        let (api, service) = service();
        let mut ids = Vec::new();
        for i in 0..3 {
            let uploaded = service
                .upload(MediaFile::new(format!("{}.jpg", i), vec![1u8, 2, 3]))
                .await
                .unwrap();
            ids.push(uploaded.public_id);
        }
        ids.extend((0..MAX_BULK_DELETE).map(|i| format!("ghost-{}", i)));

        let result = service.delete_many(ids.clone()).await.unwrap();

        assert_eq!(result.successes.len(), 3);
        assert_eq!(result.failures.len(), MAX_BULK_DELETE);
        assert!(result.failures.iter().all(|f| f.error == NOT_FOUND_STATUS));
        assert!(api.is_empty());
    }
}
