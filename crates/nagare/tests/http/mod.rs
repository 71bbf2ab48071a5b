use nagare::HttpClient;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn test_default_client_sends_jar_cookies() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::default();
    client.add_cookies(vec!["session=abc".to_string()], server.uri())?;
    assert_eq!(client.cookie_count(), 1);

    // clones share the jar
    let cloned = client.clone();
    assert_eq!(cloned.fetch(format!("{}/me", server.uri()))?.text().await?, "ok");

    client.clear_cookies();
    assert_eq!(cloned.cookie_count(), 0);
    Ok(())
}
