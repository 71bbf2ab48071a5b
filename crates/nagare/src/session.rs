use std::sync::Arc;

use crate::{
    error::NagareResult,
    http::HttpClient,
    plugin::{Metadata, Parsers, Plugin, PluginContext, PluginInstance, StreamList},
    registry::{Matches, PluginRegistry},
};

/// Result of resolving one URL.
#[derive(Debug)]
pub struct Resolved {
    pub plugin: &'static str,
    pub metadata: Metadata,
    pub streams: StreamList,
}

/// Host-side entry point: HTTP client, parsers and the plugin registry.
pub struct Session {
    client: HttpClient,
    parsers: Parsers,
    registry: PluginRegistry,
}

impl Session {
    pub fn new(client: HttpClient, registry: PluginRegistry) -> Self {
        Self {
            client,
            parsers: Parsers::default(),
            registry,
        }
    }

    pub fn with_parsers(mut self, parsers: Parsers) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Finds the plugin owning `url`.
    pub fn find_plugin(&self, url: &str) -> NagareResult<Option<(Arc<dyn Plugin>, Matches)>> {
        self.registry.find(url)
    }

    /// Binds the plugin owning `url` to it, or `None` when no plugin claims it.
    pub fn instantiate(&self, url: &str) -> NagareResult<Option<PluginInstance>> {
        let Some((plugin, matches)) = self.registry.find(url)? else {
            return Ok(None);
        };
        let context = PluginContext::new(self.client.clone(), self.parsers.clone(), url, matches);
        Ok(Some(PluginInstance::new(plugin, context)))
    }

    pub async fn resolve(&self, url: &str) -> NagareResult<Option<Resolved>> {
        let Some(mut instance) = self.instantiate(url)? else {
            log::debug!("No plugin matches {url}");
            return Ok(None);
        };

        let plugin = instance.name();
        let streams = instance.resolve().await?;
        log::debug!("{plugin} resolved {} stream(s)", streams.len());

        Ok(Some(Resolved {
            plugin,
            metadata: instance.into_metadata(),
            streams,
        }))
    }
}
