use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use tracing::debug;
use uuid::Uuid;

use crate::channel::upload_channel;
use crate::{
    ApiCapabilities, ApiError, BulkDeleteResponse, DestroyResponse, MediaApi, MediaError,
    MediaResult, ResourceResponse, UploadCallback, UploadOptions, UploadResponse, UploadSink,
    NOT_FOUND_STATUS,
};

const CHANNEL_CAPACITY: usize = 16;
const MAX_BULK_DELETE: usize = 1000;

/// S3 settings read from `MEDIA_S3_*` environment variables
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub public_base_url: Option<String>,
}

impl S3Config {
    pub fn from_env() -> MediaResult<Self> {
        fn required(key: &str) -> MediaResult<String> {
            optional(key).ok_or_else(|| MediaError::config(format!("{} environment variable required", key)))
        }

        fn optional(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        }

        Ok(Self {
            bucket: required("MEDIA_S3_BUCKET")?,
            region: required("MEDIA_S3_REGION")?,
            endpoint_url: optional("MEDIA_S3_ENDPOINT_URL"),
            access_key_id: optional("MEDIA_S3_ACCESS_KEY_ID"),
            secret_access_key: optional("MEDIA_S3_SECRET_ACCESS_KEY"),
            public_base_url: optional("MEDIA_S3_PUBLIC_BASE_URL"),
        })
    }

    /// Public URL of an object key
    pub fn object_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key),
        }
    }
}

/// S3-compatible media provider using AWS SDK
#[derive(Clone)]
pub struct S3MediaApi {
    client: Client,
    config: S3Config,
}

impl S3MediaApi {
    pub async fn new(config: S3Config) -> Self {
        let client = Self::create_client(&config).await;
        Self { client, config }
    }

    async fn create_client(config: &S3Config) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                None,
                None,
                "dog-media",
            ));
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url.clone());
        }

        let aws_config = loader.load().await;
        let force_path_style = config.endpoint_url.is_some();

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(force_path_style)
                .build(),
        )
    }

    fn map_aws_error(err: impl std::error::Error) -> ApiError {
        ApiError::transport(err.to_string())
    }
}

#[async_trait]
impl MediaApi for S3MediaApi {
    fn upload_stream(&self, options: UploadOptions, callback: UploadCallback) -> UploadSink {
        let (sink, receiver) = upload_channel(CHANNEL_CAPACITY);
        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let key = format!("{}/{}", options.resource_type, Uuid::new_v4().simple());
        let secure_url = self.config.object_url(&key);

        tokio::spawn(async move {
            let data = match receiver.collect().await {
                Ok(data) => data,
                Err(err) => return callback(Err(err)),
            };
            let size = data.len() as u64;

            let mut request = client
                .put_object()
                .bucket(&bucket)
                .key(&key)
                .body(AwsByteStream::from(data));
            if let Some(content_type) = options.content_type {
                request = request.content_type(content_type);
            }
            if let Some(file_name) = options.file_name {
                request = request.metadata("filename", file_name);
            }

            match request.send().await {
                Ok(_) => {
                    debug!(%key, size, "Stored media in S3");
                    callback(Ok(UploadResponse {
                        public_id: Some(key),
                        secure_url: Some(secure_url),
                        bytes: Some(size),
                    }))
                }
                Err(err) => callback(Err(Self::map_aws_error(err))),
            }
        });

        sink
    }

    async fn destroy(&self, public_id: &str) -> Result<DestroyResponse, ApiError> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(public_id)
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(DestroyResponse::new("ok"))
    }

    async fn delete_resources(&self, public_ids: &[String]) -> Result<BulkDeleteResponse, ApiError> {
        let objects = public_ids
            .iter()
            .map(|id| ObjectIdentifier::builder().key(id).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::map_aws_error)?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(Self::map_aws_error)?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.config.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        let mut deleted: HashMap<String, String> = HashMap::with_capacity(public_ids.len());
        for object in output.deleted() {
            if let Some(key) = object.key() {
                deleted.insert(key.to_string(), "deleted".to_string());
            }
        }
        for error in output.errors() {
            if let Some(key) = error.key() {
                let status = match error.code() {
                    Some("NoSuchKey") | None => NOT_FOUND_STATUS.to_string(),
                    Some(code) => code.to_string(),
                };
                deleted.insert(key.to_string(), status);
            }
        }

        Ok(BulkDeleteResponse {
            partial: !output.errors().is_empty(),
            deleted,
        })
    }

    async fn resource(&self, public_id: &str) -> Result<ResourceResponse, ApiError> {
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(public_id)
            .send()
            .await
        {
            Ok(_) => Ok(ResourceResponse {
                public_id: public_id.to_string(),
                secure_url: Some(self.config.object_url(public_id)),
            }),
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_not_found() {
                    Err(ApiError::NotFound(public_id.to_string()))
                } else {
                    Err(Self::map_aws_error(service_error))
                }
            }
        }
    }

    fn capabilities(&self) -> ApiCapabilities {
        ApiCapabilities::basic().with_bulk_delete(Some(MAX_BULK_DELETE))
    }
}
