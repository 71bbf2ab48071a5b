use std::{fmt, sync::LazyLock};

use async_trait::async_trait;
use nagare::{
    stream::HlsOptions, ApiResult, Metadata, NagareResult, Parsers, Pattern, Plugin, PluginArgs,
    PluginContext, Stream, StreamList,
};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};

use crate::{ChzzkApi, ChzzkConfig};

static LIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://chzzk\.naver\.com/live/(?P<channel_id>[^/?]+)").unwrap());
static VIDEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://chzzk\.naver\.com/video/(?P<video_id>[^/?]+)").unwrap());
static CLIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://chzzk\.naver\.com/clips/(?P<clip_id>[^/?]+)").unwrap());

const STATUS_OPEN: &str = "OPEN";
const MIME_TYPE_TS: &str = "video/mp2t";

/// Why a resolution yields no streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoStreams {
    /// The live status is not `OPEN`.
    Offline,
    AdultOnly,
    Unavailable,
    /// No media entry uses the HLS protocol.
    NoHlsMedia,
}

impl fmt::Display for NoStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoStreams::Offline => "The stream is unavailable",
            NoStreams::AdultOnly => "This content is for adults only",
            NoStreams::Unavailable => "This content is unavailable",
            NoStreams::NoHlsMedia => "No HLS media found",
        })
    }
}

impl NoStreams {
    fn withheld(adult: bool) -> Self {
        if adult {
            NoStreams::AdultOnly
        } else {
            NoStreams::Unavailable
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Streams(StreamList),
    NoStreams(NoStreams),
    /// The API answered with an error message.
    UpstreamError(String),
    /// The API answered with empty content.
    Empty,
}

/// Splits an API result into its payload or the outcome to stop with.
fn payload<T>(result: ApiResult<T>) -> Result<T, Outcome> {
    match result {
        ApiResult::Data(data) => Ok(data),
        ApiResult::Empty => Err(Outcome::Empty),
        ApiResult::Error(message) => Err(Outcome::UpstreamError(message)),
    }
}

pub struct Chzzk {
    config: ChzzkConfig,
}

impl Chzzk {
    pub fn new(config: ChzzkConfig) -> Self {
        Self { config }
    }

    pub fn from_args(args: &PluginArgs) -> Self {
        Self::new(ChzzkConfig::from_args(args))
    }

    /// Resolves the URL of `ctx`, reporting why no streams are yielded.
    pub async fn outcome(&self, ctx: &mut PluginContext) -> NagareResult<Outcome> {
        let api = ChzzkApi::new(ctx.client().clone(), self.config.clone());
        let parsers = ctx.parsers().clone();

        if let Some(channel_id) = ctx.group("live", "channel_id").map(str::to_string) {
            live(&api, &parsers, &channel_id, &mut ctx.metadata).await
        } else if let Some(video_id) = ctx.group("video", "video_id").map(str::to_string) {
            let info = api.video(&video_id).await?;
            vod(&api, &parsers, info, &mut ctx.metadata).await
        } else if let Some(clip_id) = ctx.group("clip", "clip_id").map(str::to_string) {
            let info = api.clip(&clip_id).await?;
            vod(&api, &parsers, info, &mut ctx.metadata).await
        } else {
            Ok(Outcome::Empty)
        }
    }
}

impl Default for Chzzk {
    fn default() -> Self {
        Self::new(ChzzkConfig::default())
    }
}

async fn live(
    api: &ChzzkApi,
    parsers: &Parsers,
    channel_id: &str,
    metadata: &mut Metadata,
) -> NagareResult<Outcome> {
    let detail = match payload(api.live_detail(channel_id).await?) {
        Ok(detail) => detail,
        Err(outcome) => return Ok(outcome),
    };

    metadata.id = detail.id;
    metadata.author = Some(detail.author);
    metadata.category = detail.category;
    metadata.title = detail.title;

    if detail.status != STATUS_OPEN {
        return Ok(Outcome::NoStreams(NoStreams::Offline));
    }
    let Some(media) = detail.media else {
        return Ok(Outcome::NoStreams(NoStreams::withheld(detail.adult)));
    };

    let Some((_, _, path)) = media
        .into_iter()
        .find(|(media_id, protocol, _)| media_id == "HLS" && protocol == "HLS")
    else {
        return Ok(Outcome::NoStreams(NoStreams::NoHlsMedia));
    };

    log::debug!("HLS media: {path}");
    let streams = parsers
        .hls
        .parse_variant_playlist(api.client(), &path, HlsOptions::default())
        .await?;
    Ok(Outcome::Streams(streams))
}

async fn vod(
    api: &ChzzkApi,
    parsers: &Parsers,
    info: ApiResult<crate::model::VodInfo>,
    metadata: &mut Metadata,
) -> NagareResult<Outcome> {
    let info = match payload(info) {
        Ok(info) => info,
        Err(outcome) => return Ok(outcome),
    };

    let (Some(key), Some(video_id)) = (info.key, info.video_id) else {
        return Ok(Outcome::NoStreams(NoStreams::withheld(info.adult)));
    };

    metadata.id = info.id;
    metadata.author = Some(info.author);
    metadata.category = info.category;
    metadata.title = info.title;

    let url = api.playback_url(&video_id, &key);
    log::debug!("DASH manifest: {url}");

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/dash+xml"));
    let streams = parsers
        .dash
        .parse_manifest(api.client(), &url, &headers)
        .await?
        .into_iter()
        .filter(|(_, stream)| {
            matches!(stream, Stream::Dash(dash) if dash.video_mime_type() == Some(MIME_TYPE_TS))
        })
        .collect();
    Ok(Outcome::Streams(streams))
}

#[async_trait]
impl Plugin for Chzzk {
    fn name(&self) -> &'static str {
        "chzzk"
    }

    fn help(&self) -> Vec<String> {
        [
            "Resolves Chzzk lives, videos and clips.",
            "",
            "Template:",
            "- https://chzzk.naver.com/live/*",
            "- https://chzzk.naver.com/video/*",
            "- https://chzzk.naver.com/clips/*",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn patterns(&self) -> Vec<Pattern> {
        vec![
            Pattern::named("live", LIVE.clone()),
            Pattern::named("video", VIDEO.clone()),
            Pattern::named("clip", CLIP.clone()),
        ]
    }

    async fn resolve(&self, ctx: &mut PluginContext) -> NagareResult<StreamList> {
        match self.outcome(ctx).await? {
            Outcome::Streams(streams) => Ok(streams),
            Outcome::NoStreams(reason) => {
                log::error!("{reason}");
                Ok(Vec::new())
            }
            Outcome::UpstreamError(message) => {
                log::error!("{message}");
                Ok(Vec::new())
            }
            Outcome::Empty => Ok(Vec::new()),
        }
    }
}
