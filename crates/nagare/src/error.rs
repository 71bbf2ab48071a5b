use thiserror::Error;

use crate::validate::ValidationError;

#[derive(Error, Debug)]
pub enum NagareError {
    #[error("HTTP error: {status} when requesting {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    ValidationError(#[from] ValidationError),

    #[error("Ambiguous match for {url}: both {first} and {second} claim it")]
    AmbiguousMatch {
        url: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("Plugin registered twice: {0}")]
    DuplicatePlugin(&'static str),

    #[error("Pattern name {pattern} declared twice by plugin {plugin}")]
    DuplicatePattern {
        plugin: &'static str,
        pattern: &'static str,
    },

    #[error("Plugin {0} declares no pattern")]
    NoPattern(&'static str),

    #[error("Invalid plugin argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid watch window in {url}: {reason}")]
    InvalidWatchWindow { url: String, reason: String },

    #[error("M3u8 fetch error")]
    M3u8FetchError,

    #[error("Invalid m3u8 file: {0}")]
    M3u8ParseError(String),

    #[error(transparent)]
    MpdParseError(#[from] dash_mpd::DashMpdError),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    HeaderValueError(#[from] reqwest::header::InvalidHeaderValue),
}

pub type NagareResult<T> = Result<T, NagareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = NagareError::AmbiguousMatch {
            url: "https://a.test/x".to_string(),
            first: "one",
            second: "two",
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous match for https://a.test/x: both one and two claim it"
        );
        assert_eq!(
            NagareError::NoPattern("one").to_string(),
            "Plugin one declares no pattern"
        );

        let err: NagareError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, NagareError::UrlParseError(_)));
    }
}
