use crate::upload::is_secure_url;
use crate::{MediaError, MediaResult, ResourceType};

pub const DEFAULT_PROVIDER: &str = "memory";
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
pub const DEFAULT_DELIVERY_BASE_URL: &str = "https://media.local";

/// Configuration for the media gateway
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Registered name of the provider to use
    pub provider: String,

    /// Resource type requested from the provider on upload
    pub resource_type: ResourceType,

    /// Size of each slice written into the provider upload stream
    pub chunk_size: usize,

    /// Base of the public URLs handed out by providers that build their own
    pub delivery_base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            resource_type: ResourceType::Image,
            chunk_size: DEFAULT_CHUNK_SIZE,
            delivery_base_url: DEFAULT_DELIVERY_BASE_URL.to_string(),
        }
    }
}

impl MediaConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `MEDIA_*` environment variables, keeping defaults for unset keys
    pub fn from_env() -> MediaResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> MediaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(provider) = get("MEDIA_PROVIDER") {
            config.provider = provider.trim().to_string();
        }
        if let Some(resource_type) = get("MEDIA_RESOURCE_TYPE") {
            config.resource_type = resource_type.parse::<ResourceType>().map_err(MediaError::config)?;
        }
        if let Some(chunk_size) = get("MEDIA_CHUNK_SIZE") {
            config.chunk_size = chunk_size.trim().parse::<usize>().map_err(|_| {
                MediaError::config(format!("MEDIA_CHUNK_SIZE is not a number: {}", chunk_size))
            })?;
        }
        if let Some(base_url) = get("MEDIA_DELIVERY_BASE_URL") {
            config.delivery_base_url = base_url.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Set provider name
    pub fn with_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set upload resource type
    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    /// Set stream chunk size
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set delivery base URL
    pub fn with_delivery_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.delivery_base_url = url.into();
        self
    }

    pub fn validate(&self) -> MediaResult<()> {
        if self.provider.trim().is_empty() {
            return Err(MediaError::config("provider name is empty"));
        }
        if self.chunk_size == 0 {
            return Err(MediaError::config("chunk size must be greater than zero"));
        }
        if !is_secure_url(&self.delivery_base_url) {
            return Err(MediaError::config(format!(
                "delivery base URL must be an absolute https URL: {}",
                self.delivery_base_url
            )));
        }
        Ok(())
    }

    /// Delivery base URL without a trailing slash
    pub(crate) fn delivery_root(&self) -> &str {
        self.delivery_base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = MediaConfig::default();
        assert_eq!(config.provider, "memory");
        assert_eq!(config.resource_type, ResourceType::Image);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reads_overrides() {
        let config = MediaConfig::from_lookup(lookup(&[
            ("MEDIA_PROVIDER", "s3"),
            ("MEDIA_RESOURCE_TYPE", "video"),
            ("MEDIA_CHUNK_SIZE", "1024"),
            ("MEDIA_DELIVERY_BASE_URL", "https://cdn.example.com/"),
        ]))
        .unwrap();

        assert_eq!(config.provider, "s3");
        assert_eq!(config.resource_type, ResourceType::Video);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.delivery_root(), "https://cdn.example.com");
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = MediaConfig::from_lookup(lookup(&[("MEDIA_PROVIDER", "  ")])).unwrap();
        assert_eq!(config.provider, DEFAULT_PROVIDER);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(MediaConfig::from_lookup(lookup(&[("MEDIA_CHUNK_SIZE", "lots")])).is_err());
        assert!(MediaConfig::from_lookup(lookup(&[("MEDIA_CHUNK_SIZE", "0")])).is_err());
        assert!(MediaConfig::from_lookup(lookup(&[("MEDIA_RESOURCE_TYPE", "pdf")])).is_err());
        assert!(MediaConfig::from_lookup(lookup(&[(
            "MEDIA_DELIVERY_BASE_URL",
            "http://insecure.example.com"
        )]))
        .is_err());
    }
}
