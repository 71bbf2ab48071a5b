pub mod model;
mod plugin;

pub use plugin::{Chzzk, NoStreams, Outcome};

use model::{LiveDetail, VodInfo};
use nagare::{query_api_typed, ApiResult, HttpClient, NagareResult, PluginArgs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChzzkConfig {
    pub api_base: String,
    pub playback_base: String,
}

impl Default for ChzzkConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.chzzk.naver.com".to_string(),
            playback_base: "https://apis.naver.com/neonplayer/vodplay/v2/playback".to_string(),
        }
    }
}

impl ChzzkConfig {
    pub fn from_args(args: &PluginArgs) -> Self {
        let default = Self::default();
        Self {
            api_base: args.get("chzzk-api-base").unwrap_or(default.api_base),
            playback_base: args
                .get("chzzk-playback-base")
                .unwrap_or(default.playback_base),
        }
    }
}

#[derive(Clone)]
pub struct ChzzkApi {
    client: HttpClient,
    config: ChzzkConfig,
}

impl ChzzkApi {
    pub fn new(client: HttpClient, config: ChzzkConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub async fn live_detail(&self, channel_id: &str) -> NagareResult<ApiResult<LiveDetail>> {
        let url = format!(
            "{}/service/v3/channels/{channel_id}/live-detail",
            self.config.api_base
        );
        query_api_typed(&self.client, &url, model::live_detail()).await
    }

    pub async fn video(&self, video_id: &str) -> NagareResult<ApiResult<VodInfo>> {
        let url = format!("{}/service/v2/videos/{video_id}", self.config.api_base);
        query_api_typed(&self.client, &url, model::video()).await
    }

    pub async fn clip(&self, clip_id: &str) -> NagareResult<ApiResult<VodInfo>> {
        let url = format!(
            "{}/service/v1/play-info/clip/{clip_id}",
            self.config.api_base
        );
        query_api_typed(&self.client, &url, model::clip()).await
    }

    /// DASH manifest of a video or clip.
    pub fn playback_url(&self, video_id: &str, key: &str) -> String {
        format!("{}/{video_id}?key={key}", self.config.playback_base)
    }
}
