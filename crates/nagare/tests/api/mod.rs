use nagare::{
    api::query_api_typed,
    query_api,
    validate::{is_type, mapping, required, union_get, ValueType},
    ApiResult, HttpClient, NagareError,
};
use wiremock::MockServer;

use crate::ServerMock;

fn schemas() -> Vec<nagare::validate::Schema> {
    vec![
        mapping([
            (required("id"), is_type(ValueType::Int)),
            (required("title"), is_type(ValueType::String)),
        ]),
        union_get(["id", "title"]),
    ]
}

#[tokio::test]
async fn test_envelope_shapes() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock("/data", 200, r#"{"code":200,"message":null,"content":{"id":42,"title":"t","extra":[]}}"#)
        .await
        .mock("/empty", 200, r#"{"code":200,"content":null}"#)
        .await
        .mock("/missing", 404, r#"{"code":404,"message":"Channel not found"}"#)
        .await
        .mock("/bad-request", 400, r#"{"code":400,"message":"Bad request"}"#)
        .await;

    let client = HttpClient::default();

    let result = query_api_typed::<(i64, String)>(&client, &server.url("/data"), schemas()).await?;
    assert_eq!(result, ApiResult::Data((42, "t".to_string())));

    let result = query_api(&client, &server.url("/empty"), schemas()).await?;
    assert_eq!(result, ApiResult::Empty);

    let result = query_api(&client, &server.url("/missing"), schemas()).await?;
    assert_eq!(result, ApiResult::Error("Channel not found".to_string()));

    let result = query_api(&client, &server.url("/bad-request"), schemas()).await?;
    assert_eq!(result, ApiResult::Error("Bad request".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_transport_and_schema_failures_propagate() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock("/oops", 500, r#"{"code":500,"message":"Internal"}"#)
        .await
        .mock("/drift", 200, r#"{"code":200,"content":{"id":"42","title":"t"}}"#)
        .await;

    let client = HttpClient::default();

    let result = query_api(&client, &server.url("/oops"), schemas()).await;
    assert!(matches!(
        result,
        Err(NagareError::HttpStatus { status, .. }) if status.as_u16() == 500
    ));

    let result = query_api(&client, &server.url("/drift"), schemas()).await;
    match result {
        Err(NagareError::ValidationError(e)) => assert_eq!(e.path_string(), "$.content.id"),
        other => panic!("Expected a validation error, got {other:?}"),
    }

    Ok(())
}
