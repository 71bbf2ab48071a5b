use std::{collections::HashSet, sync::Arc};

use regex::Regex;

use crate::{
    error::{NagareError, NagareResult},
    plugin::Plugin,
    validate::RegexMatch,
};

/// A URL pattern declared by a plugin, optionally carrying a symbolic name.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: Option<&'static str>,
    regex: Regex,
}

impl Pattern {
    pub fn new(regex: Regex) -> Self {
        Self { name: None, regex }
    }

    pub fn named(name: &'static str, regex: Regex) -> Self {
        Self {
            name: Some(name),
            regex,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Matches `url` from its first character.
    fn try_match(&self, url: &str) -> Option<RegexMatch> {
        let captures = self.regex.captures(url)?;
        let whole = captures.get(0)?;
        (whole.start() == 0).then(|| RegexMatch::new(&self.regex, &captures))
    }
}

/// Matched patterns of one plugin for one URL, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Matches {
    entries: Vec<(Option<&'static str>, RegexMatch)>,
}

impl Matches {
    /// Match object of the pattern called `name`, absent when that pattern did not match.
    pub fn get(&self, name: &str) -> Option<&RegexMatch> {
        self.entries
            .iter()
            .find(|(n, _)| *n == Some(name))
            .map(|(_, m)| m)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The active match: the first pattern, in declaration order, that matched.
    pub fn active(&self) -> Option<&RegexMatch> {
        self.entries.first().map(|(_, m)| m)
    }

    /// Name of the active pattern.
    pub fn active_name(&self) -> Option<&'static str> {
        self.entries.first().and_then(|(n, _)| *n)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().filter_map(|(n, _)| *n)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

struct PluginDescriptor {
    plugin: Arc<dyn Plugin>,
    patterns: Vec<Pattern>,
}

impl PluginDescriptor {
    fn try_match(&self, url: &str) -> Matches {
        Matches {
            entries: self
                .patterns
                .iter()
                .filter_map(|p| p.try_match(url).map(|m| (p.name(), m)))
                .collect(),
        }
    }
}

/// Ordered collection of plugins, populated at startup and read-only afterwards.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(&mut self, plugin: P) -> NagareResult<&mut Self>
    where
        P: Plugin + 'static,
    {
        self.register_arc(Arc::new(plugin))
    }

    pub fn register_arc(&mut self, plugin: Arc<dyn Plugin>) -> NagareResult<&mut Self> {
        let name = plugin.name();
        if self.plugins.iter().any(|d| d.plugin.name() == name) {
            return Err(NagareError::DuplicatePlugin(name));
        }

        let patterns = plugin.patterns();
        if patterns.is_empty() {
            return Err(NagareError::NoPattern(name));
        }
        let mut seen = HashSet::new();
        for pattern in patterns.iter().filter_map(|p| p.name()) {
            if !seen.insert(pattern) {
                return Err(NagareError::DuplicatePattern {
                    plugin: name,
                    pattern,
                });
            }
        }

        log::debug!("Registered plugin {name} with {} pattern(s)", patterns.len());
        self.plugins.push(PluginDescriptor { plugin, patterns });
        Ok(self)
    }

    /// Finds the unique plugin owning `url`.
    ///
    /// Returns [NagareError::AmbiguousMatch] when two plugins claim the URL.
    pub fn find(&self, url: &str) -> NagareResult<Option<(Arc<dyn Plugin>, Matches)>> {
        let mut found: Option<(&PluginDescriptor, Matches)> = None;

        for descriptor in &self.plugins {
            let matches = descriptor.try_match(url);
            if matches.is_empty() {
                continue;
            }

            if let Some((first, _)) = &found {
                return Err(NagareError::AmbiguousMatch {
                    url: url.to_string(),
                    first: first.plugin.name(),
                    second: descriptor.plugin.name(),
                });
            }
            found = Some((descriptor, matches));
        }

        Ok(found.map(|(descriptor, matches)| (descriptor.plugin.clone(), matches)))
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter().map(|d| &d.plugin)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{PluginContext, StreamList};
    use async_trait::async_trait;

    struct TestPlugin {
        name: &'static str,
        patterns: Vec<Pattern>,
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        fn patterns(&self) -> Vec<Pattern> {
            self.patterns.clone()
        }

        async fn resolve(&self, _ctx: &mut PluginContext) -> NagareResult<StreamList> {
            Ok(Vec::new())
        }
    }

    fn video_site() -> TestPlugin {
        TestPlugin {
            name: "video-site",
            patterns: vec![
                Pattern::named(
                    "live",
                    Regex::new(r"https?://video\.test/live/(?P<channel>[^/?]+)").unwrap(),
                ),
                Pattern::named(
                    "video",
                    Regex::new(r"https?://video\.test/(?:video|live)/(?P<id>\d+)").unwrap(),
                ),
            ],
        }
    }

    #[test]
    fn test_find_exposes_all_matching_patterns() -> anyhow::Result<()> {
        let mut registry = PluginRegistry::new();
        registry.register(video_site())?;

        let (plugin, matches) = registry.find("https://video.test/live/123")?.unwrap();
        assert_eq!(plugin.name(), "video-site");
        assert_eq!(matches.names().collect::<Vec<_>>(), vec!["live", "video"]);
        assert_eq!(matches.active_name(), Some("live"));
        assert_eq!(matches.get("live").unwrap().name("channel"), Some("123"));
        assert_eq!(matches.get("video").unwrap().name("id"), Some("123"));

        let (_, matches) = registry.find("https://video.test/video/7")?.unwrap();
        assert!(!matches.contains("live"));
        assert_eq!(matches.active_name(), Some("video"));

        assert!(registry.find("https://other.test/live/1")?.is_none());
        Ok(())
    }

    #[test]
    fn test_match_is_anchored_at_start() -> anyhow::Result<()> {
        let mut registry = PluginRegistry::new();
        registry.register(video_site())?;

        assert!(registry
            .find("https://evil.test/?u=https://video.test/live/1")?
            .is_none());
        Ok(())
    }

    #[test]
    fn test_ambiguous_match() -> anyhow::Result<()> {
        let mut registry = PluginRegistry::new();
        registry.register(video_site())?;
        registry.register(TestPlugin {
            name: "greedy",
            patterns: vec![Pattern::new(Regex::new(r"https?://video\.test/").unwrap())],
        })?;

        match registry.find("https://video.test/live/1") {
            Err(NagareError::AmbiguousMatch { first, second, .. }) => {
                assert_eq!(first, "video-site");
                assert_eq!(second, "greedy");
            }
            _ => panic!("Expected ambiguous match"),
        }

        // only the greedy plugin claims this one
        let (plugin, matches) = registry.find("https://video.test/about")?.unwrap();
        assert_eq!(plugin.name(), "greedy");
        assert_eq!(matches.active_name(), None);
        assert!(matches.active().is_some());
        Ok(())
    }

    #[test]
    fn test_registration_errors() {
        let mut registry = PluginRegistry::new();
        registry.register(video_site()).unwrap();
        assert!(matches!(
            registry.register(video_site()),
            Err(NagareError::DuplicatePlugin("video-site"))
        ));

        let duplicated = TestPlugin {
            name: "duplicated",
            patterns: vec![
                Pattern::named("live", Regex::new("a").unwrap()),
                Pattern::named("live", Regex::new("b").unwrap()),
            ],
        };
        assert!(matches!(
            registry.register(duplicated),
            Err(NagareError::DuplicatePattern {
                plugin: "duplicated",
                pattern: "live"
            })
        ));

        let empty = TestPlugin {
            name: "empty",
            patterns: vec![],
        };
        assert!(matches!(
            registry.register(empty),
            Err(NagareError::NoPattern("empty"))
        ));
        assert_eq!(registry.len(), 1);
    }
}
