use std::sync::LazyLock;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use nagare::{stream::UrlRefresher, validate::*, HttpClient, NagareError, NagareResult};
use regex::Regex;
use reqwest::header::REFERER;
use url::Url;

static EMBED_IFRAME: LazyLock<XPath> =
    LazyLock::new(|| XPath::parse(".//iframe[contains(@src,'embed')][1]/@src").unwrap());
static OVVA_SCRIPT: LazyLock<XPath> =
    LazyLock::new(|| XPath::parse(".//script[contains(text(),'ovva-player')]/text()").unwrap());
static OVVA_CONFIG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"ovva-player","([^"]*)"\)"#).unwrap());

fn embed_schema() -> Schema {
    all([parse_html(), xpath_string(EMBED_IFRAME.clone())])
}

fn balancer_schema() -> Schema {
    all([
        parse_html(),
        xpath_string(OVVA_SCRIPT.clone()),
        is_type(ValueType::String),
        regex(OVVA_CONFIG.clone()),
        get(1),
        transform(|value: Value| -> Result<Value, String> {
            let encoded = value.as_str().ok_or("ovva-player config is not a string")?;
            let decoded = STANDARD.decode(encoded).map_err(|e| e.to_string())?;
            String::from_utf8(decoded)
                .map(Value::String)
                .map_err(|e| e.to_string())
        }),
        parse_json(),
        mapping([(required("balancer"), url())]),
        get("balancer"),
    ])
}

/// The balancer answers with `302=<url>`.
fn hls_url_schema() -> Schema {
    all([
        transform(|value: Value| -> Result<Value, String> {
            let body = value.as_str().ok_or("balancer response is not a string")?;
            let (status, url) = body
                .trim()
                .split_once('=')
                .ok_or_else(|| format!("unexpected balancer response {body:?}"))?;
            Ok(Value::List(vec![status.into(), url.into()]))
        }),
        union([
            all([get(0), equals("302")]),
            all([get(1), url_with_path(endswith(".m3u8"))]),
        ]),
        get(1),
    ])
}

/// Derives the current HLS URL of a 1+1 channel page.
pub struct OnePlusOneApi {
    client: HttpClient,
    url: String,
}

impl OnePlusOneApi {
    pub fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `Ok(None)` when the page carries no usable player.
    pub async fn hls_url(&self) -> NagareResult<Option<String>> {
        self.client.clear_cookies();

        let embed: Option<String> = self
            .client
            .fetch(self.url.as_str())?
            .validate(&embed_schema())
            .await?
            .into_typed()?;
        let Some(embed) = embed else {
            log::debug!("No embedded player in {}", self.url);
            return Ok(None);
        };
        log::trace!("embed={embed}");

        let embed_url = Url::parse(&self.url)?.join(&embed)?;
        let balancer = self
            .client
            .fetch(embed_url.clone())?
            .header(REFERER, &self.url)?
            .validate(&balancer_schema())
            .await;
        let balancer: String = match balancer {
            Ok(balancer) => balancer.into_typed()?,
            Err(NagareError::ValidationError(e)) => {
                log::error!("ovva-player: {e}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        log::debug!("balancer={balancer}");

        let hls_url: String = self
            .client
            .fetch(balancer.as_str())?
            .header(REFERER, &self.url)?
            .validate(&hls_url_schema())
            .await?
            .into_typed()?;
        log::debug!("hls={hls_url}");
        Ok(Some(hls_url))
    }
}

#[async_trait]
impl UrlRefresher for OnePlusOneApi {
    async fn refresh(&self) -> NagareResult<Option<String>> {
        self.hls_url().await
    }
}
