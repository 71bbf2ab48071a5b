//! Streams yielded by plugins.
//!
//! A stream only knows where its entry document lives. `open()` fetches that
//! document; segment downloading is left to the consumer.

mod refresh;

pub use refresh::{
    Clock, ManualClock, RefreshingHlsStream, SystemClock, UrlRefresher, WatchWindowConfig,
};

use dash_mpd::MPD;
use m3u8_rs::MediaPlaylist;
use reqwest::header::HeaderMap;
use url::Url;

use crate::{dash::fetch_manifest, error::NagareResult, hls::load_media_playlist, http::HttpClient};

#[derive(Debug, Clone)]
pub enum Stream {
    Hls(HlsStream),
    RefreshingHls(RefreshingHlsStream),
    Dash(DashStream),
    Http(HttpStream),
}

/// Entry document of an opened stream.
#[derive(Debug)]
pub enum OpenedStream {
    Hls { url: Url, playlist: MediaPlaylist },
    Dash { url: Url, manifest: MPD },
    Http(reqwest::Response),
}

impl Stream {
    /// Current URL of the stream. Refreshing streams may re-resolve it.
    pub async fn url(&self) -> NagareResult<Url> {
        match self {
            Stream::Hls(stream) => Ok(stream.url().clone()),
            Stream::RefreshingHls(stream) => stream.url().await,
            Stream::Dash(stream) => Ok(stream.url().clone()),
            Stream::Http(stream) => Ok(stream.url().clone()),
        }
    }

    pub async fn open(&self) -> NagareResult<OpenedStream> {
        match self {
            Stream::Hls(stream) => stream.open().await,
            Stream::RefreshingHls(stream) => stream.open().await,
            Stream::Dash(stream) => stream.open().await,
            Stream::Http(stream) => stream.open().await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Stream::Hls(_) | Stream::RefreshingHls(_) => "hls",
            Stream::Dash(_) => "dash",
            Stream::Http(_) => "http",
        }
    }
}

/// Attributes of one `#EXT-X-STREAM-INF` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantInfo {
    pub bandwidth: u64,
    pub resolution: Option<(u64, u64)>,
    pub frame_rate: Option<f64>,
    pub codecs: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HlsOptions {
    /// Number of segments from the live edge to start from.
    pub live_edge: Option<u32>,
    pub segment_threads: Option<u32>,
    pub headers: HeaderMap,
    pub retry: u32,
}

impl Default for HlsOptions {
    fn default() -> Self {
        Self {
            live_edge: None,
            segment_threads: None,
            headers: HeaderMap::new(),
            retry: 3,
        }
    }
}

impl HlsOptions {
    pub fn with_live_edge(mut self, live_edge: u32) -> Self {
        self.live_edge = Some(live_edge);
        self
    }

    pub fn with_segment_threads(mut self, segment_threads: u32) -> Self {
        self.segment_threads = Some(segment_threads);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HlsStream {
    client: HttpClient,
    url: Url,
    /// The variant playlist this stream was picked from, if any.
    master: Option<Url>,
    variant: Option<VariantInfo>,
    options: HlsOptions,
}

impl HlsStream {
    pub fn new(client: HttpClient, url: Url, options: HlsOptions) -> Self {
        Self {
            client,
            url,
            master: None,
            variant: None,
            options,
        }
    }

    pub fn with_variant(mut self, master: Url, variant: VariantInfo) -> Self {
        self.master = Some(master);
        self.variant = Some(variant);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn master(&self) -> Option<&Url> {
        self.master.as_ref()
    }

    pub fn variant(&self) -> Option<&VariantInfo> {
        self.variant.as_ref()
    }

    pub fn options(&self) -> &HlsOptions {
        &self.options
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub(crate) async fn open_url(&self, url: Url) -> NagareResult<OpenedStream> {
        let (url, playlist) =
            load_media_playlist(&self.client, url, &self.options.headers, self.options.retry)
                .await?;
        Ok(OpenedStream::Hls { url, playlist })
    }

    pub async fn open(&self) -> NagareResult<OpenedStream> {
        self.open_url(self.url.clone()).await
    }
}

/// Video representation of a DASH stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Representation {
    pub id: Option<String>,
    pub mime_type: Option<String>,
    pub bandwidth: Option<u64>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub codecs: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DashStream {
    client: HttpClient,
    manifest_url: Url,
    headers: HeaderMap,
    pub video_representation: Option<Representation>,
    pub audio_representation: Option<Representation>,
}

impl DashStream {
    pub fn new(client: HttpClient, manifest_url: Url, headers: HeaderMap) -> Self {
        Self {
            client,
            manifest_url,
            headers,
            video_representation: None,
            audio_representation: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.manifest_url
    }

    /// MIME type of the video representation.
    pub fn video_mime_type(&self) -> Option<&str> {
        self.video_representation
            .as_ref()
            .and_then(|r| r.mime_type.as_deref())
    }

    pub async fn open(&self) -> NagareResult<OpenedStream> {
        let manifest = fetch_manifest(&self.client, self.manifest_url.clone(), &self.headers).await?;
        Ok(OpenedStream::Dash {
            url: self.manifest_url.clone(),
            manifest,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpStream {
    client: HttpClient,
    url: Url,
    headers: HeaderMap,
}

impl HttpStream {
    pub fn new(client: HttpClient, url: Url) -> Self {
        Self {
            client,
            url,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn open(&self) -> NagareResult<OpenedStream> {
        let response = self
            .client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(OpenedStream::Http(response))
    }
}
