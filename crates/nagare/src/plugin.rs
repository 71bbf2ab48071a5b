use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;

use crate::{
    dash::DashParser,
    error::{NagareError, NagareResult},
    hls::HlsParser,
    http::HttpClient,
    registry::{Matches, Pattern},
    stream::Stream,
    validate::RegexMatch,
};

/// `(quality, stream)` pairs produced by a resolution. No ordering is implied.
pub type StreamList = Vec<(String, Stream)>;

/// A unit that claims a set of URL patterns and resolves matching URLs to streams.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn help(&self) -> Vec<String> {
        vec!["No help available".to_string()]
    }

    /// Declared URL patterns. A URL belongs to this plugin iff one of them matches.
    fn patterns(&self) -> Vec<Pattern>;

    /// Resolves the URL held by `ctx`. An empty list means no streams are available.
    async fn resolve(&self, ctx: &mut PluginContext) -> NagareResult<StreamList>;
}

/// Metadata filled in by a plugin while resolving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub id: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
}

/// HLS and DASH parsers supplied by the host.
#[derive(Clone)]
pub struct Parsers {
    pub hls: Arc<dyn HlsParser>,
    pub dash: Arc<dyn DashParser>,
}

impl Default for Parsers {
    fn default() -> Self {
        Self {
            hls: Arc::new(crate::hls::M3u8VariantParser::default()),
            dash: Arc::new(crate::dash::MpdManifestParser),
        }
    }
}

/// State of one resolution: created by the dispatcher, discarded afterwards.
pub struct PluginContext {
    client: HttpClient,
    parsers: Parsers,
    url: String,
    matches: Matches,
    pub metadata: Metadata,
}

impl PluginContext {
    pub fn new(client: HttpClient, parsers: Parsers, url: impl Into<String>, matches: Matches) -> Self {
        Self {
            client,
            parsers,
            url: url.into(),
            matches,
            metadata: Metadata::default(),
        }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn parsers(&self) -> &Parsers {
        &self.parsers
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn matches(&self) -> &Matches {
        &self.matches
    }

    /// The currently active match.
    pub fn matched(&self) -> Option<&RegexMatch> {
        self.matches.active()
    }

    /// Named group of the match of pattern `pattern`.
    pub fn group(&self, pattern: &str, group: &str) -> Option<&str> {
        self.matches.get(pattern).and_then(|m| m.name(group))
    }
}

/// A plugin bound to one URL.
pub struct PluginInstance {
    plugin: Arc<dyn Plugin>,
    context: PluginContext,
}

impl PluginInstance {
    pub fn new(plugin: Arc<dyn Plugin>, context: PluginContext) -> Self {
        Self { plugin, context }
    }

    pub fn name(&self) -> &'static str {
        self.plugin.name()
    }

    pub fn matches(&self) -> &Matches {
        self.context.matches()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.context.metadata
    }

    pub async fn resolve(&mut self) -> NagareResult<StreamList> {
        log::debug!(
            "Resolving {} with plugin {}",
            self.context.url(),
            self.plugin.name()
        );
        self.plugin.resolve(&mut self.context).await
    }

    pub fn into_metadata(self) -> Metadata {
        self.context.metadata
    }
}

/// `key=value` arguments passed from the host to plugin constructors.
#[derive(Debug, Clone, Default)]
pub struct PluginArgs {
    inner: HashMap<String, String>,
}

impl PluginArgs {
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.to_string())
    }

    /// Parses the argument `key` into `T`, returning `None` when it is absent.
    pub fn parse<T>(&self, key: &str) -> NagareResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.inner
            .get(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|e| NagareError::InvalidArgument(format!("{key}={value}: {e}")))
            })
            .transpose()
    }

    pub fn from_key_value(input: &[String]) -> NagareResult<Self> {
        let inner = input
            .iter()
            .map(|s| {
                s.split_once('=')
                    .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                    .ok_or_else(|| NagareError::InvalidArgument(s.clone()))
            })
            .collect::<NagareResult<_>>()?;
        Ok(Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_args() {
        let args = PluginArgs::from_key_value(&[
            "a=1".to_string(),
            "b = x=y".to_string(),
        ])
        .unwrap();
        assert_eq!(args.get("missing"), None);
        assert_eq!(args.get("a").as_deref(), Some("1"));
        assert_eq!(args.get("b").as_deref(), Some(" x=y"));
        assert_eq!(args.parse::<u32>("a").unwrap(), Some(1));
        assert_eq!(args.parse::<u32>("missing").unwrap(), None);
        assert!(args.parse::<u32>("b").is_err());

        assert!(PluginArgs::from_key_value(&["novalue".to_string()]).is_err());
    }
}
