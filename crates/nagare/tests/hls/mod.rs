use nagare::{
    hls::{HlsParser, M3u8VariantParser},
    stream::{HlsOptions, OpenedStream},
    HttpClient, Stream,
};
use wiremock::MockServer;

use crate::ServerMock;

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,FRAME-RATE=30.000,CODECS=\"avc1.4d401e,mp4a.40.2\"
360/chunklist.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=6000000,RESOLUTION=1920x1080,FRAME-RATE=60.000
1080/chunklist.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=128000
audio/chunklist.m3u8
";

const MEDIA: &str = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXT-X-VERSION:3
#EXTINF:9.009,
segment0.ts
#EXT-X-ENDLIST";

#[tokio::test]
async fn test_parse_variant_playlist() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.mock("/master.m3u8", 200, MASTER).await;

    let client = HttpClient::default();
    let streams = M3u8VariantParser
        .parse_variant_playlist(&client, &server.url("/master.m3u8"), HlsOptions::default().with_live_edge(10))
        .await?;

    let names: Vec<_> = streams.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["360p", "1080p60", "128k"]);

    let Stream::Hls(stream) = &streams[1].1 else {
        panic!("Expected an HLS stream");
    };
    assert_eq!(stream.url().as_str(), server.url("/1080/chunklist.m3u8"));
    assert_eq!(stream.variant().map(|v| v.bandwidth), Some(6000000));
    assert_eq!(stream.options().live_edge, Some(10));

    let Stream::Hls(stream) = &streams[0].1 else {
        panic!("Expected an HLS stream");
    };
    assert_eq!(
        stream.variant().and_then(|v| v.codecs.as_deref()),
        Some("avc1.4d401e,mp4a.40.2")
    );
    Ok(())
}

#[tokio::test]
async fn test_media_playlist_is_live() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.mock("/chunklist.m3u8", 200, MEDIA).await;

    let client = HttpClient::default();
    let streams = M3u8VariantParser
        .parse_variant_playlist(&client, &server.url("/chunklist.m3u8"), HlsOptions::default())
        .await?;
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].0, "live");
    assert_eq!(streams[0].1.kind(), "hls");
    Ok(())
}

#[tokio::test]
async fn test_open_follows_best_variant() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock("/master.m3u8", 200, MASTER)
        .await
        .mock("/1080/chunklist.m3u8", 200, MEDIA)
        .await;

    let client = HttpClient::default();
    let stream = Stream::Hls(nagare::stream::HlsStream::new(
        client,
        server.url("/master.m3u8").parse()?,
        HlsOptions::default(),
    ));

    let OpenedStream::Hls { url, playlist } = stream.open().await? else {
        panic!("Expected an HLS playlist");
    };
    assert_eq!(url.as_str(), server.url("/1080/chunklist.m3u8"));
    assert_eq!(playlist.segments.len(), 1);
    assert_eq!(playlist.segments[0].uri, "segment0.ts");
    Ok(())
}

#[tokio::test]
async fn test_open_gives_up_after_retries() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.mock("/broken.m3u8", 200, "not a playlist").await;

    let client = HttpClient::default();
    let stream = Stream::Hls(nagare::stream::HlsStream::new(
        client,
        server.url("/broken.m3u8").parse()?,
        HlsOptions::default(),
    ));
    assert!(matches!(
        stream.open().await,
        Err(nagare::NagareError::M3u8FetchError)
    ));
    Ok(())
}
