use std::collections::HashSet;

use async_trait::async_trait;
use dash_mpd::{AdaptationSet, MPD};
use reqwest::header::{HeaderMap, ACCEPT};
use url::Url;

use crate::{
    error::NagareResult,
    hls::unique_name,
    http::HttpClient,
    plugin::StreamList,
    stream::{DashStream, Representation, Stream},
};

/// Turns a DASH manifest into named streams.
#[async_trait]
pub trait DashParser: Send + Sync {
    async fn parse_manifest(
        &self,
        client: &HttpClient,
        url: &str,
        headers: &HeaderMap,
    ) -> NagareResult<StreamList>;
}

pub(crate) async fn fetch_manifest(
    client: &HttpClient,
    url: Url,
    headers: &HeaderMap,
) -> NagareResult<MPD> {
    let mut request = client.fetch(url)?.headers(headers);
    if !headers.contains_key(ACCEPT) {
        request = request.header(ACCEPT, "application/dash+xml,video/vnd.mpeg.dash.mpd")?;
    }
    let text = request.text().await?;
    Ok(dash_mpd::parse(&text)?)
}

/// [DashParser] backed by `dash-mpd`.
///
/// Every video representation of the first period becomes a stream, paired with
/// the best audio representation. Audio is exposed alone when there is no video.
#[derive(Debug, Clone, Copy, Default)]
pub struct MpdManifestParser;

#[async_trait]
impl DashParser for MpdManifestParser {
    async fn parse_manifest(
        &self,
        client: &HttpClient,
        url: &str,
        headers: &HeaderMap,
    ) -> NagareResult<StreamList> {
        let url = Url::parse(url)?;
        let mpd = fetch_manifest(client, url.clone(), headers).await?;
        let (videos, audios) = representations(&mpd);
        log::debug!(
            "{url}: {} video and {} audio representation(s)",
            videos.len(),
            audios.len()
        );

        let best_audio = audios.iter().max_by_key(|r| r.bandwidth.unwrap_or(0)).cloned();
        let mut names = HashSet::new();
        let mut streams = Vec::new();

        for video in videos {
            let name = match video.height {
                Some(height) => format!("{height}p"),
                None => format!("{}k", video.bandwidth.unwrap_or(0) / 1000),
            };
            let mut stream = DashStream::new(client.clone(), url.clone(), headers.clone());
            stream.video_representation = Some(video);
            stream.audio_representation = best_audio.clone();
            streams.push((unique_name(&mut names, name), Stream::Dash(stream)));
        }

        if streams.is_empty() {
            for audio in audios {
                let name = format!("a{}k", audio.bandwidth.unwrap_or(0) / 1000);
                let mut stream = DashStream::new(client.clone(), url.clone(), headers.clone());
                stream.audio_representation = Some(audio);
                streams.push((unique_name(&mut names, name), Stream::Dash(stream)));
            }
        }

        Ok(streams)
    }
}

enum ContentKind {
    Video,
    Audio,
    Other,
}

fn content_kind(adaptation: &AdaptationSet, representation: &dash_mpd::Representation) -> ContentKind {
    let declared = representation
        .contentType
        .as_deref()
        .or(adaptation.contentType.as_deref())
        .or(representation.mimeType.as_deref())
        .or(adaptation.mimeType.as_deref())
        .unwrap_or_default();

    if declared.starts_with("video") || representation.height.is_some() {
        ContentKind::Video
    } else if declared.starts_with("audio") {
        ContentKind::Audio
    } else {
        ContentKind::Other
    }
}

/// Video and audio representations of the first period.
fn representations(mpd: &MPD) -> (Vec<Representation>, Vec<Representation>) {
    let mut videos = Vec::new();
    let mut audios = Vec::new();

    let Some(period) = mpd.periods.first() else {
        return (videos, audios);
    };
    for adaptation in &period.adaptations {
        for representation in &adaptation.representations {
            let converted = Representation {
                id: representation.id.clone(),
                mime_type: representation
                    .mimeType
                    .clone()
                    .or_else(|| adaptation.mimeType.clone()),
                bandwidth: representation.bandwidth,
                width: representation.width,
                height: representation.height,
                codecs: representation
                    .codecs
                    .clone()
                    .or_else(|| adaptation.codecs.clone()),
            };
            match content_kind(adaptation, representation) {
                ContentKind::Video => videos.push(converted),
                ContentKind::Audio => audios.push(converted),
                ContentKind::Other => {}
            }
        }
    }

    (videos, audios)
}
