use std::collections::HashSet;

use async_trait::async_trait;
use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist, VariantStream};
use reqwest::header::HeaderMap;
use url::Url;

use crate::{
    error::{NagareError, NagareResult},
    http::HttpClient,
    plugin::StreamList,
    stream::{HlsOptions, HlsStream, Stream, VariantInfo},
};

/// Turns an HLS variant playlist into named streams.
#[async_trait]
pub trait HlsParser: Send + Sync {
    async fn parse_variant_playlist(
        &self,
        client: &HttpClient,
        url: &str,
        options: HlsOptions,
    ) -> NagareResult<StreamList>;
}

/// [HlsParser] backed by `m3u8-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct M3u8VariantParser;

#[async_trait]
impl HlsParser for M3u8VariantParser {
    async fn parse_variant_playlist(
        &self,
        client: &HttpClient,
        url: &str,
        options: HlsOptions,
    ) -> NagareResult<StreamList> {
        let url = Url::parse(url)?;
        let text = client
            .fetch(url.clone())?
            .headers(&options.headers)
            .text()
            .await?;

        let playlist = m3u8_rs::parse_playlist_res(text.as_bytes())
            .map_err(|e| NagareError::M3u8ParseError(e.to_string()))?;
        match playlist {
            Playlist::MasterPlaylist(master) => variant_streams(client, &url, master, &options),
            Playlist::MediaPlaylist(_) => {
                log::debug!("{url} is a media playlist");
                Ok(vec![(
                    "live".to_string(),
                    Stream::Hls(HlsStream::new(client.clone(), url, options)),
                )])
            }
        }
    }
}

fn variant_streams(
    client: &HttpClient,
    master_url: &Url,
    master: MasterPlaylist,
    options: &HlsOptions,
) -> NagareResult<StreamList> {
    let mut names = HashSet::new();
    let mut streams = Vec::new();

    for variant in master.variants.into_iter().filter(|v| !v.is_i_frame) {
        let url = master_url.join(&variant.uri)?;
        let name = unique_name(&mut names, quality_name(&variant));
        log::trace!("variant {name}: {url}");

        let info = VariantInfo {
            bandwidth: variant.bandwidth,
            resolution: variant.resolution.map(|r| (r.width, r.height)),
            frame_rate: variant.frame_rate,
            codecs: variant.codecs,
        };
        let stream =
            HlsStream::new(client.clone(), url, options.clone()).with_variant(master_url.clone(), info);
        streams.push((name, Stream::Hls(stream)));
    }

    Ok(streams)
}

/// `720p`, `1080p60` or `1500k` when the resolution is unknown.
fn quality_name(variant: &VariantStream) -> String {
    match variant.resolution {
        Some(resolution) => {
            let fps = variant.frame_rate.map(|f| f.round() as u64).filter(|f| *f > 30);
            match fps {
                Some(fps) => format!("{}p{fps}", resolution.height),
                None => format!("{}p", resolution.height),
            }
        }
        None => format!("{}k", variant.bandwidth / 1000),
    }
}

pub(crate) fn unique_name(names: &mut HashSet<String>, name: String) -> String {
    if names.insert(name.clone()) {
        return name;
    }

    let mut index = 1;
    loop {
        let candidate = if index == 1 {
            format!("{name}_alt")
        } else {
            format!("{name}_alt{index}")
        };
        if names.insert(candidate.clone()) {
            return candidate;
        }
        index += 1;
    }
}

/// Fetches `url` until it parses, following a master playlist to its best variant.
pub async fn load_media_playlist(
    client: &HttpClient,
    url: Url,
    headers: &HeaderMap,
    total_retry: u32,
) -> NagareResult<(Url, MediaPlaylist)> {
    let mut url = url;
    loop {
        log::debug!("Fetching M3U8 file {url}");

        let mut retry = total_retry;
        let parsed = loop {
            if retry == 0 {
                return Err(NagareError::M3u8FetchError);
            }

            match client.fetch(url.clone())?.headers(headers).text().await {
                Ok(text) => match m3u8_rs::parse_playlist_res(text.as_bytes()) {
                    Ok(parsed) => break parsed,
                    Err(error) => {
                        log::warn!("Failed to parse M3U8 file: {error}");
                        retry -= 1;
                    }
                },
                Err(error) => {
                    log::warn!("Failed to fetch M3U8 file: {error}");
                    retry -= 1;
                }
            }
        };

        match parsed {
            Playlist::MasterPlaylist(pl) => {
                let Some(variant) = best_variant(pl.variants) else {
                    return Err(NagareError::M3u8ParseError(format!(
                        "no variant in master playlist {url}"
                    )));
                };
                url = url.join(&variant.uri)?;
                log::debug!(
                    "Best stream: {url}; Bandwidth: {bandwidth}",
                    bandwidth = variant.bandwidth
                );
            }
            Playlist::MediaPlaylist(pl) => return Ok((url, pl)),
        }
    }
}

fn best_variant(variants: Vec<VariantStream>) -> Option<VariantStream> {
    variants
        .into_iter()
        .filter(|v| !v.is_i_frame)
        .max_by(|a, b| {
            // compare resolution first
            if let (Some(a), Some(b)) = (a.resolution, b.resolution) {
                if a.width != b.width {
                    return a.width.cmp(&b.width);
                }
            }

            // compare framerate then
            if let (Some(a), Some(b)) = (a.frame_rate, b.frame_rate) {
                let a = a as u64;
                let b = b as u64;
                if a != b {
                    return a.cmp(&b);
                }
            }

            // compare bandwidth finally
            a.bandwidth.cmp(&b.bandwidth)
        })
}
