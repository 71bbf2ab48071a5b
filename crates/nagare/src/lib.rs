pub mod api;
pub mod dash;
pub mod error;
pub mod hls;
pub mod http;
pub mod plugin;
pub mod registry;
pub mod session;
pub mod stream;
pub mod validate;

pub use api::{query_api, query_api_typed, ApiResult};
pub use error::{NagareError, NagareResult};
pub use http::HttpClient;
pub use plugin::{Metadata, Parsers, Plugin, PluginArgs, PluginContext, PluginInstance, StreamList};
pub use registry::{Matches, Pattern, PluginRegistry};
pub use session::{Resolved, Session};
pub use stream::Stream;

pub use async_trait::async_trait;
pub use regex::Regex;
pub use reqwest;
