//! The `{code, message}` / `{code, content}` JSON envelope shared by upstream APIs.

use crate::{
    error::NagareResult,
    http::HttpClient,
    validate::{
        all, any, equals, get, is_type, mapping, parse_json, required, transform, FromValue,
        Schema, ValidationError, Value, ValueType,
    },
};

/// Status codes whose bodies carry an envelope instead of being transport failures.
pub const ACCEPTABLE_STATUS: [u16; 3] = [200, 400, 404];

/// Outcome of one upstream API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    /// The upstream answered with `{code, message}`.
    Error(String),
    /// `{code: 200, content: null}`
    Empty,
    Data(T),
}

impl<T> ApiResult<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            ApiResult::Error(message) => ApiResult::Error(message),
            ApiResult::Empty => ApiResult::Empty,
            ApiResult::Data(data) => ApiResult::Data(f(data)),
        }
    }

    pub fn data(self) -> Option<T> {
        match self {
            ApiResult::Data(data) => Some(data),
            _ => None,
        }
    }
}

impl ApiResult<Value> {
    /// Converts the payload of [ApiResult::Data] into `T`.
    pub fn into_typed<T: FromValue>(self) -> Result<ApiResult<T>, ValidationError> {
        match self {
            ApiResult::Error(message) => Ok(ApiResult::Error(message)),
            ApiResult::Empty => Ok(ApiResult::Empty),
            ApiResult::Data(data) => Ok(ApiResult::Data(data.into_typed()?)),
        }
    }
}

const ERROR_TAG: &str = "error";
const EMPTY_TAG: &str = "empty";
const DATA_TAG: &str = "data";

fn tagged(tag: &'static str) -> Schema {
    transform(move |value| Ok::<_, String>(Value::List(vec![tag.into(), value])))
}

/// Schema matching the three envelope shapes, in order, then running `content`
/// through `schemas`.
///
/// The result is a `[tag, payload]` pair read back by [envelope_result].
pub fn envelope(schemas: impl IntoIterator<Item = Schema>) -> Schema {
    let data = std::iter::once(get("content"))
        .chain(schemas)
        .chain(std::iter::once(tagged(DATA_TAG)));

    all([
        parse_json(),
        any([
            all([
                mapping([
                    (required("code"), is_type(ValueType::Int)),
                    (required("message"), is_type(ValueType::String)),
                ]),
                get("message"),
                tagged(ERROR_TAG),
            ]),
            all([
                mapping([
                    (required("code"), equals(200)),
                    (required("content"), is_type(ValueType::Null)),
                ]),
                transform(|_| Ok::<_, String>(Value::Null)),
                tagged(EMPTY_TAG),
            ]),
            all([
                mapping([
                    (required("code"), equals(200)),
                    (required("content"), is_type(ValueType::Map)),
                ]),
                all(data),
            ]),
        ]),
    ])
}

fn envelope_result(value: Value) -> Result<ApiResult<Value>, ValidationError> {
    let (tag, payload): (String, Value) = value.into_typed()?;
    Ok(match tag.as_str() {
        ERROR_TAG => ApiResult::Error(payload.into_typed()?),
        EMPTY_TAG => ApiResult::Empty,
        _ => ApiResult::Data(payload),
    })
}

/// Issues a GET to `url` and classifies the envelope.
///
/// Upstream application errors become [ApiResult::Error]. Transport failures,
/// statuses outside [ACCEPTABLE_STATUS] and bodies matching no envelope shape
/// are returned as errors.
pub async fn query_api(
    client: &HttpClient,
    url: &str,
    schemas: impl IntoIterator<Item = Schema>,
) -> NagareResult<ApiResult<Value>> {
    let value = client
        .fetch(url)?
        .acceptable_status(&ACCEPTABLE_STATUS)
        .validate(&envelope(schemas))
        .await?;
    Ok(envelope_result(value)?)
}

/// [query_api] with the payload converted into `T`.
pub async fn query_api_typed<T: FromValue>(
    client: &HttpClient,
    url: &str,
    schemas: impl IntoIterator<Item = Schema>,
) -> NagareResult<ApiResult<T>> {
    Ok(query_api(client, url, schemas).await?.into_typed()?)
}
