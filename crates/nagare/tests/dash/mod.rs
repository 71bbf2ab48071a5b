use nagare::{
    dash::{DashParser, MpdManifestParser},
    reqwest::header::{HeaderMap, HeaderValue, ACCEPT},
    stream::OpenedStream,
    HttpClient, Stream,
};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT10S" minBufferTime="PT2S" profiles="urn:mpeg:dash:profile:isoff-on-demand:2011">
  <Period id="0">
    <AdaptationSet mimeType="video/mp2t">
      <Representation id="ts-1080" bandwidth="3000000" width="1920" height="1080"/>
    </AdaptationSet>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="mp4-1080" bandwidth="2500000" width="1920" height="1080"/>
      <Representation id="mp4-480" bandwidth="800000" width="854" height="480"/>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4">
      <Representation id="audio-low" bandwidth="64000"/>
      <Representation id="audio-high" bandwidth="128000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

const AUDIO_ONLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT10S" minBufferTime="PT2S">
  <Period>
    <AdaptationSet contentType="audio" mimeType="audio/mp4">
      <Representation id="a" bandwidth="96000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

#[tokio::test]
async fn test_parse_manifest() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest.mpd"))
        .and(header("accept", "application/dash+xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MANIFEST))
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/dash+xml"));

    let client = HttpClient::default();
    let url = format!("{}/manifest.mpd", server.uri());
    let streams = MpdManifestParser.parse_manifest(&client, &url, &headers).await?;

    let names: Vec<_> = streams.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["1080p", "1080p_alt", "480p"]);

    let Stream::Dash(stream) = &streams[0].1 else {
        panic!("Expected a DASH stream");
    };
    assert_eq!(stream.video_mime_type(), Some("video/mp2t"));
    assert_eq!(
        stream.audio_representation.as_ref().and_then(|r| r.id.as_deref()),
        Some("audio-high")
    );
    assert_eq!(stream.url().as_str(), url);

    let OpenedStream::Dash { manifest, .. } = streams[2].1.open().await? else {
        panic!("Expected a DASH manifest");
    };
    assert_eq!(manifest.periods.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_audio_only_manifest() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio.mpd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(AUDIO_ONLY))
        .mount(&server)
        .await;

    let client = HttpClient::default();
    let url = format!("{}/audio.mpd", server.uri());
    let streams = MpdManifestParser
        .parse_manifest(&client, &url, &HeaderMap::new())
        .await?;

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].0, "a96k");
    assert_eq!(streams[0].1.kind(), "dash");
    Ok(())
}
