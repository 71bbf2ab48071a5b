use nagare::{
    async_trait,
    stream::HttpStream,
    NagareResult, Pattern, Plugin, PluginContext, PluginRegistry, Regex, Session, Stream,
    StreamList,
};

struct DirectPlugin;

#[async_trait]
impl Plugin for DirectPlugin {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn patterns(&self) -> Vec<Pattern> {
        vec![
            Pattern::named(
                "file",
                Regex::new(r"https?://files\.test/(?P<name>[^/?]+)\.mp4").unwrap(),
            ),
            Pattern::named("page", Regex::new(r"https?://files\.test/page/").unwrap()),
        ]
    }

    async fn resolve(&self, ctx: &mut PluginContext) -> NagareResult<StreamList> {
        if ctx.matches().contains("page") {
            return Ok(Vec::new());
        }

        let name = ctx.group("file", "name").map(str::to_string);
        ctx.metadata.id = name.clone();
        ctx.metadata.title = name;

        let url = ctx.url().parse()?;
        Ok(vec![(
            "source".to_string(),
            Stream::Http(HttpStream::new(ctx.client().clone(), url)),
        )])
    }
}

fn session() -> anyhow::Result<Session> {
    let mut registry = PluginRegistry::new();
    registry.register(DirectPlugin)?;
    Ok(Session::new(nagare::HttpClient::default(), registry))
}

#[tokio::test]
async fn test_resolve() -> anyhow::Result<()> {
    let session = session()?;

    let resolved = session
        .resolve("https://files.test/clip.mp4")
        .await?
        .expect("plugin should match");
    assert_eq!(resolved.plugin, "direct");
    assert_eq!(resolved.metadata.id.as_deref(), Some("clip"));
    assert_eq!(resolved.streams.len(), 1);
    assert_eq!(
        resolved.streams[0].1.url().await?.as_str(),
        "https://files.test/clip.mp4"
    );
    Ok(())
}

#[tokio::test]
async fn test_resolve_without_streams() -> anyhow::Result<()> {
    let session = session()?;

    let resolved = session
        .resolve("https://files.test/page/1")
        .await?
        .expect("plugin should match");
    assert!(resolved.streams.is_empty());
    assert_eq!(resolved.metadata, Default::default());

    assert!(session.resolve("https://other.test/clip.mp4").await?.is_none());
    Ok(())
}
