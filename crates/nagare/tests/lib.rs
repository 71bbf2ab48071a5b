mod api;
mod dash;
mod hls;
mod http;
mod session;

use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

trait ServerMock {
    async fn mock<S>(&self, mock_path: &str, status: u16, body: S) -> &Self
    where
        S: AsRef<str>;

    fn url(&self, mock_path: &str) -> String;
}

impl ServerMock for MockServer {
    async fn mock<S>(&self, mock_path: &str, status: u16, body: S) -> &Self
    where
        S: AsRef<str>,
    {
        Mock::given(method("GET"))
            .and(path(mock_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body.as_ref()))
            .mount(self)
            .await;
        self
    }

    fn url(&self, mock_path: &str) -> String {
        format!("{}{mock_path}", self.uri())
    }
}
