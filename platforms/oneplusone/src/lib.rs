mod api;

pub use api::OnePlusOneApi;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use nagare::{
    stream::{Clock, HlsOptions, RefreshingHlsStream, SystemClock, WatchWindowConfig},
    HttpClient, NagareResult, Parsers, Pattern, Plugin, PluginArgs, PluginContext, Stream,
    StreamList,
};
use regex::Regex;

static CHANNEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://1plus1\.video/(?:(?P<locale>\w{2})/)?tvguide/(?P<channel>[^/]+)/online")
        .unwrap()
});

pub struct OnePlusOne {
    window: WatchWindowConfig,
    clock: Arc<dyn Clock>,
}

impl OnePlusOne {
    pub fn new(window: WatchWindowConfig) -> Self {
        Self {
            window,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_args(args: &PluginArgs) -> NagareResult<Self> {
        let default = WatchWindowConfig::default();
        Ok(Self::new(WatchWindowConfig {
            deadline_segment: args
                .parse("oneplusone-deadline-segment")?
                .unwrap_or(default.deadline_segment),
            margin: args
                .parse("oneplusone-deadline-margin")?
                .unwrap_or(default.margin),
            backoff: args
                .parse("oneplusone-refresh-backoff")?
                .unwrap_or(default.backoff),
        }))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn window(&self) -> &WatchWindowConfig {
        &self.window
    }

    /// Resolves the channel page at `page_url` into self-refreshing HLS streams.
    pub async fn resolve_page(
        &self,
        client: &HttpClient,
        parsers: &Parsers,
        page_url: &str,
    ) -> NagareResult<StreamList> {
        let api = Arc::new(OnePlusOneApi::new(client.clone(), page_url));
        let Some(hls_url) = api.hls_url().await? else {
            return Ok(Vec::new());
        };

        let options = HlsOptions::default()
            .with_live_edge(10)
            .with_segment_threads(2);
        let variants = parsers
            .hls
            .parse_variant_playlist(client, &hls_url, options)
            .await?;

        let mut streams = Vec::with_capacity(variants.len());
        for (quality, stream) in variants {
            let stream = match stream {
                Stream::Hls(hls) => Stream::RefreshingHls(RefreshingHlsStream::with_clock(
                    hls,
                    api.clone(),
                    self.window,
                    self.clock.clone(),
                )?),
                other => other,
            };
            streams.push((quality, stream));
        }
        Ok(streams)
    }
}

impl Default for OnePlusOne {
    fn default() -> Self {
        Self::new(WatchWindowConfig::default())
    }
}

#[async_trait]
impl Plugin for OnePlusOne {
    fn name(&self) -> &'static str {
        "oneplusone"
    }

    fn help(&self) -> Vec<String> {
        [
            "Resolves live channels of 1+1 video.",
            "",
            "Template:",
            "- https://1plus1.video/tvguide/*/online",
            "- https://1plus1.video/{locale}/tvguide/*/online",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn patterns(&self) -> Vec<Pattern> {
        vec![Pattern::new(CHANNEL.clone())]
    }

    async fn resolve(&self, ctx: &mut PluginContext) -> NagareResult<StreamList> {
        ctx.metadata.id = ctx
            .matched()
            .and_then(|m| m.name("channel"))
            .map(str::to_string);

        let page_url = ctx.url().to_string();
        let parsers = ctx.parsers().clone();
        self.resolve_page(ctx.client(), &parsers, &page_url).await
    }
}
