use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::batch::{classify_bulk_delete, expand_delete_result, fan_out, unique_ids};
use crate::error::non_blank_or;
use crate::upload::{is_secure_url, stream_upload};
use crate::{
    is_deleted_status, ApiError, DeleteFailure, DeleteSuccess, DeleteManyResult, FailureCause, MediaApi,
    MediaConfig, MediaError, MediaFile, MediaProvider, MediaResult, ResolveManyResult,
    UploadFailure, UploadManyResult, UploadOptions, UploadSuccess, UrlFailure, UrlSuccess,
    DELETE_FAILED, NOT_FOUND_STATUS, RESOLVE_FAILED, UPLOAD_FAILED,
};

/// Media gateway over a remote media API.
///
/// Turns the provider's streaming upload, delete and lookup primitives into
/// the [`MediaProvider`] operations.
pub struct MediaService {
    api: Arc<dyn MediaApi>,
    config: MediaConfig,
}

impl MediaService {
    /// Create a new media service
    pub fn new<A: MediaApi + 'static>(api: A, config: MediaConfig) -> Self {
        Self {
            api: Arc::new(api),
            config,
        }
    }

    /// Create from an API handle that is shared elsewhere
    pub fn from_shared(api: Arc<dyn MediaApi>, config: MediaConfig) -> Self {
        Self { api, config }
    }

    /// Get configuration
    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    fn upload_options(&self, file: &MediaFile) -> UploadOptions {
        let options = UploadOptions::new(self.config.resource_type).with_file_name(&file.file_name);
        match &file.content_type {
            Some(content_type) => options.with_content_type(content_type),
            None => options,
        }
    }

    /// One bulk call per provider-sized slice.
    ///
    /// Ids in a failed slice are reported with the call's error; the batch
    /// only fails as a whole when every call failed.
    async fn bulk_delete(
        &self,
        public_ids: Vec<String>,
        max_per_call: Option<usize>,
    ) -> MediaResult<DeleteManyResult> {
        let requested: Vec<String> = unique_ids(&public_ids)
            .into_iter()
            .filter(|id| !id.trim().is_empty())
            .collect();

        let per_call = max_per_call
            .filter(|max| *max > 0)
            .unwrap_or_else(|| requested.len().max(1));

        let slices: Vec<&[String]> = requested.chunks(per_call).collect();
        let responses = join_all(slices.iter().map(|ids| self.api.delete_resources(ids))).await;

        let mut statuses = HashMap::with_capacity(requested.len());
        let mut call_errors = Vec::new();
        for (ids, response) in slices.iter().zip(responses) {
            match response {
                Ok(response) => {
                    if response.partial {
                        debug!(count = ids.len(), "Provider reported a partial bulk delete");
                    }
                    statuses.extend(response.deleted);
                }
                Err(err) => {
                    warn!(error = %err, count = ids.len(), "Bulk delete call failed");
                    let reason = non_blank_or(err.to_string(), DELETE_FAILED);
                    call_errors.push((*ids, reason));
                }
            }
        }

        if !slices.is_empty() && call_errors.len() == slices.len() {
            let message = call_errors
                .into_iter()
                .map(|(_, reason)| reason)
                .next()
                .unwrap_or_else(|| DELETE_FAILED.to_string());
            return Err(MediaError::delete_failed(
                requested.join(","),
                FailureCause::Transport(message),
            ));
        }

        for (ids, reason) in call_errors {
            for id in ids {
                statuses.insert(id.clone(), reason.clone());
            }
        }

        Ok(classify_bulk_delete(&public_ids, &statuses))
    }
}

#[async_trait]
impl MediaProvider for MediaService {
    fn name(&self) -> &str {
        &self.config.provider
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name, bytes = file.len()))]
    async fn upload(&self, file: MediaFile) -> MediaResult<UploadSuccess> {
        let options = self.upload_options(&file);
        let result = stream_upload(self.api.as_ref(), &file, options, self.config.chunk_size).await;

        match &result {
            Ok(uploaded) => info!(public_id = %uploaded.public_id, "Uploaded media"),
            Err(err) => warn!(error = %err, "Media upload failed"),
        }
        result
    }

    #[instrument(skip(self, files), fields(count = files.len()))]
    async fn upload_many(&self, files: Vec<MediaFile>) -> UploadManyResult {
        fan_out(
            files,
            |file| file.file_name.clone(),
            |file| self.upload(file),
            |file_name, error| UploadFailure { file_name, error },
            UPLOAD_FAILED,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, public_id: &str) -> MediaResult<()> {
        if public_id.trim().is_empty() {
            return Err(MediaError::delete_failed(public_id, FailureCause::EmptyId));
        }

        let response = self.api.destroy(public_id).await.map_err(|err| {
            let cause = match err {
                ApiError::NotFound(_) => FailureCause::NotFound,
                other => FailureCause::Transport(other.to_string()),
            };
            MediaError::delete_failed(public_id, cause)
        })?;

        if !is_deleted_status(&response.result) {
            warn!(status = %response.result, "Provider refused delete");
            let cause = if response.result == NOT_FOUND_STATUS {
                FailureCause::NotFound
            } else {
                FailureCause::Status(response.result)
            };
            return Err(MediaError::delete_failed(public_id, cause));
        }

        info!("Deleted media");
        Ok(())
    }

    #[instrument(skip(self, public_ids), fields(count = public_ids.len()))]
    async fn delete_many(&self, public_ids: Vec<String>) -> MediaResult<DeleteManyResult> {
        if public_ids.is_empty() {
            return Ok(DeleteManyResult::empty());
        }

        let capabilities = self.api.capabilities();
        if capabilities.bulk_delete {
            return self.bulk_delete(public_ids, capabilities.max_bulk_delete).await;
        }

        let unique = fan_out(
            unique_ids(&public_ids),
            |id| id.clone(),
            |id| async move {
                match self.delete(&id).await {
                    Ok(()) => Ok(DeleteSuccess { public_id: id }),
                    Err(err) => Err(err.failure_status()),
                }
            },
            |public_id, error| DeleteFailure { public_id, error },
            DELETE_FAILED,
        )
        .await;

        Ok(expand_delete_result(&public_ids, unique))
    }

    #[instrument(skip(self))]
    async fn resolve_url(&self, public_id: &str) -> MediaResult<UrlSuccess> {
        if public_id.trim().is_empty() {
            return Err(MediaError::resolve_failed(public_id, FailureCause::EmptyId));
        }

        let resource = self.api.resource(public_id).await.map_err(|err| {
            let cause = match err {
                ApiError::NotFound(_) => FailureCause::NotFound,
                other => FailureCause::Transport(other.to_string()),
            };
            MediaError::resolve_failed(public_id, cause)
        })?;

        let url = resource
            .secure_url
            .filter(|url| is_secure_url(url))
            .ok_or_else(|| {
                MediaError::resolve_failed(
                    public_id,
                    FailureCause::Transport("provider returned no secure URL".to_string()),
                )
            })?;

        Ok(UrlSuccess {
            public_id: public_id.to_string(),
            url,
        })
    }

    #[instrument(skip(self, public_ids), fields(count = public_ids.len()))]
    async fn resolve_urls_many(&self, public_ids: Vec<String>) -> ResolveManyResult {
        fan_out(
            public_ids,
            |id| id.clone(),
            |id| async move { self.resolve_url(&id).await },
            |public_id, error| UrlFailure { public_id, error },
            RESOLVE_FAILED,
        )
        .await
    }
}
