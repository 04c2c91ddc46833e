use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use crate::{MediaConfig, MediaError, MediaProvider, MediaResult, MediaService, MemoryMediaApi};

/// Builds a provider from validated configuration
pub type ProviderFactory = fn(MediaConfig) -> BoxFuture<'static, MediaResult<Arc<dyn MediaProvider>>>;

/// Providers shipped with this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Memory,
    S3,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Memory => "memory",
            ProviderKind::S3 => "s3",
        }
    }

    fn factory(&self) -> Option<ProviderFactory> {
        match self {
            ProviderKind::Memory => Some(memory_factory),
            #[cfg(feature = "s3")]
            ProviderKind::S3 => Some(s3_factory),
            #[cfg(not(feature = "s3"))]
            ProviderKind::S3 => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(ProviderKind::Memory),
            "s3" => Ok(ProviderKind::S3),
            _ => Err(MediaError::UnknownProvider {
                name: s.to_string(),
            }),
        }
    }
}

fn memory_factory(config: MediaConfig) -> BoxFuture<'static, MediaResult<Arc<dyn MediaProvider>>> {
    Box::pin(async move {
        let api = MemoryMediaApi::new(&config);
        let provider: Arc<dyn MediaProvider> = Arc::new(MediaService::new(api, config));
        Ok(provider)
    })
}

#[cfg(feature = "s3")]
fn s3_factory(config: MediaConfig) -> BoxFuture<'static, MediaResult<Arc<dyn MediaProvider>>> {
    Box::pin(async move {
        let s3_config = crate::S3Config::from_env()?;
        let api = crate::S3MediaApi::new(s3_config).await;
        let provider: Arc<dyn MediaProvider> = Arc::new(MediaService::new(api, config));
        Ok(provider)
    })
}

/// Maps provider names to factories.
///
/// Resolved once at startup; the returned provider is shared by the host.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every provider compiled into this build.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in [ProviderKind::Memory, ProviderKind::S3] {
            if let Some(factory) = kind.factory() {
                registry.register(kind.as_str(), factory);
            }
        }
        registry
    }

    /// Register a factory under a given name. Names are case-insensitive.
    pub fn register<S>(&mut self, name: S, factory: ProviderFactory)
    where
        S: Into<String>,
    {
        self.factories.insert(name.into().to_ascii_lowercase(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.trim().to_ascii_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validate `config` and build the provider it names.
    pub async fn resolve(&self, config: &MediaConfig) -> MediaResult<Arc<dyn MediaProvider>> {
        config.validate()?;

        let name = config.provider.trim().to_ascii_lowercase();
        let factory = self
            .factories
            .get(&name)
            .copied()
            .ok_or_else(|| MediaError::UnknownProvider {
                name: config.provider.clone(),
            })?;

        let provider = factory(config.clone()).await?;
        info!(provider = %name, resource_type = %config.resource_type, "Media provider ready");
        Ok(provider)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaErrorKind;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Memory".parse::<ProviderKind>().unwrap(), ProviderKind::Memory);
        assert_eq!(" S3 ".parse::<ProviderKind>().unwrap(), ProviderKind::S3);
        assert_eq!(
            "cloudy".parse::<ProviderKind>().unwrap_err().kind(),
            MediaErrorKind::Configuration
        );
    }

    #[test]
    fn builtin_always_has_memory() {
        let registry = ProviderRegistry::builtin();
        assert!(registry.contains("memory"));
        assert!(registry.contains("MEMORY"));
        assert_eq!(registry.contains("s3"), cfg!(feature = "s3"));
        assert!(registry.names().contains(&"memory"));
    }

    #[tokio::test]
    async fn resolves_memory_provider() {
        let registry = ProviderRegistry::builtin();
        let provider = registry.resolve(&MediaConfig::default()).await.unwrap();
        assert_eq!(provider.name(), "memory");
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let registry = ProviderRegistry::builtin();
        let config = MediaConfig::default().with_provider("cloudy");

        match registry.resolve(&config).await {
            Err(MediaError::UnknownProvider { name }) => assert_eq!(name, "cloudy"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown provider resolved"),
        }
    }

    #[tokio::test]
    async fn invalid_config_fails_before_lookup() {
        let registry = ProviderRegistry::new();
        let config = MediaConfig::default().with_chunk_size(0);

        assert!(matches!(
            registry.resolve(&config).await,
            Err(MediaError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn custom_factories_can_be_registered() {
        fn staging(config: MediaConfig) -> BoxFuture<'static, MediaResult<Arc<dyn MediaProvider>>> {
            memory_factory(config.with_provider("staging"))
        }

        let mut registry = ProviderRegistry::new();
        registry.register("Staging", staging);

        let provider = registry
            .resolve(&MediaConfig::default().with_provider("staging"))
            .await
            .unwrap();
        assert_eq!(provider.name(), "staging");
        assert_eq!(registry.names(), vec!["staging"]);
    }
}
