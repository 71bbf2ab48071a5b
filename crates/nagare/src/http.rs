use std::{ops::Deref, sync::Arc};

use fake_user_agent::get_chrome_rua;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, ClientBuilder, IntoUrl, StatusCode, Url,
};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};

use crate::{
    error::{NagareError, NagareResult},
    validate::{Schema, Value},
};

/// Shared HTTP client with a cookie jar.
///
/// Cloning is cheap and every clone shares the same connection pool and cookies.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> NagareResult<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = builder.cookie_provider(cookies_store.clone()).build()?;

        Ok(Self {
            client,
            cookies_store,
        })
    }

    pub fn add_cookies(&self, cookies: Vec<String>, url: impl IntoUrl) -> NagareResult<()> {
        let url = url.into_url()?;
        let mut lock = self
            .cookies_store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for cookie in cookies {
            if let Err(e) = lock.parse(&cookie, &url) {
                log::warn!("Ignoring invalid cookie for {url}: {e}");
            }
        }
        Ok(())
    }

    pub fn clear_cookies(&self) {
        self.cookies_store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn cookie_count(&self) -> usize {
        self.cookies_store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter_any()
            .count()
    }

    /// Starts a GET request whose body can be validated with a [Schema].
    pub fn fetch<U: IntoUrl>(&self, url: U) -> NagareResult<HttpGet<'_>> {
        Ok(HttpGet {
            client: self,
            url: url.into_url()?,
            acceptable_status: Vec::new(),
            headers: HeaderMap::new(),
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = Client::builder()
            .user_agent(get_chrome_rua())
            .cookie_provider(cookies_store.clone())
            .build()
            .or_else(|e| {
                log::warn!("Ignoring the default user agent: {e}");
                Client::builder()
                    .cookie_provider(cookies_store.clone())
                    .build()
            })
            .unwrap_or_else(|e| {
                log::error!("Failed to build HTTP client, cookies are disabled: {e}");
                Client::new()
            });

        Self {
            client,
            cookies_store,
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").finish_non_exhaustive()
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

pub struct HttpGet<'a> {
    client: &'a HttpClient,
    url: Url,
    acceptable_status: Vec<StatusCode>,
    headers: HeaderMap,
}

impl HttpGet<'_> {
    /// Status codes treated as non-exceptional. Any 2xx is accepted when empty.
    pub fn acceptable_status(mut self, status: &[u16]) -> Self {
        self.acceptable_status = status
            .iter()
            .filter_map(|s| StatusCode::from_u16(*s).ok())
            .collect();
        self
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> NagareResult<Self> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    fn is_acceptable(&self, status: StatusCode) -> bool {
        if self.acceptable_status.is_empty() {
            status.is_success()
        } else {
            self.acceptable_status.contains(&status)
        }
    }

    pub async fn text(self) -> NagareResult<String> {
        log::trace!("GET {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !self.is_acceptable(status) {
            return Err(NagareError::HttpStatus {
                status,
                url: self.url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Sends the request and runs `schema` against the body string.
    pub async fn validate(self, schema: &Schema) -> NagareResult<Value> {
        let body = self.text().await?;
        Ok(schema.validate(Value::String(body))?)
    }
}
