use nagare::{Plugin, PluginRegistry};
use nagare_chzzk::Chzzk;

#[test]
fn test_urls_match_declared_patterns() -> anyhow::Result<()> {
    let mut registry = PluginRegistry::new();
    registry.register(Chzzk::default())?;

    let cases = [
        ("https://chzzk.naver.com/live/c68b8ef525fb3d2fa146344d84991753", "live"),
        ("http://chzzk.naver.com/live/CHID?foo=bar", "live"),
        ("https://chzzk.naver.com/video/1234567", "video"),
        ("https://chzzk.naver.com/clips/abcdefgh1234", "clip"),
    ];
    for (url, expected) in cases {
        let (plugin, matches) = registry.find(url)?.expect(url);
        assert_eq!(plugin.name(), "chzzk");
        assert_eq!(matches.names().collect::<Vec<_>>(), vec![expected], "{url}");
    }

    let invalid = [
        "https://chzzk.naver.com/",
        "https://chzzk.naver.com/lives/CHID",
        "https://example.com/?u=https://chzzk.naver.com/live/CHID",
    ];
    for url in invalid {
        assert!(registry.find(url)?.is_none(), "{url}");
    }
    Ok(())
}

#[test]
fn test_help() {
    assert!(Chzzk::default().help().iter().any(|l| l.contains("/clips/")));
}
