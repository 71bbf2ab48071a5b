use nagare::validate::*;

/// `(mediaId, protocol, path)` of one `livePlaybackJson` media entry.
pub type LiveMedia = (String, String, String);

#[derive(Debug, Clone, PartialEq)]
pub struct LiveDetail {
    /// `None` when the playback info is withheld, e.g. for adult streams.
    pub media: Option<Vec<LiveMedia>>,
    pub status: String,
    pub id: Option<String>,
    pub author: String,
    pub category: Option<String>,
    pub title: Option<String>,
    pub adult: bool,
}

impl FromValue for LiveDetail {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        let (media, status, id, author, category, title, adult) = value.into_typed()?;
        Ok(Self {
            media,
            status,
            id,
            author,
            category,
            title,
            adult,
        })
    }
}

/// Video and clip metadata. `key` and `video_id` are absent when playback is withheld.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VodInfo {
    pub adult: bool,
    pub key: Option<String>,
    pub video_id: Option<String>,
    pub id: Option<String>,
    pub author: String,
    pub title: Option<String>,
    pub category: Option<String>,
}

impl FromValue for VodInfo {
    fn from_value(value: Value) -> Result<Self, ValidationError> {
        let (adult, key, video_id, id, author, title, category) = value.into_typed()?;
        Ok(Self {
            adult,
            key,
            video_id,
            id,
            author,
            title,
            category,
        })
    }
}

fn optional_string() -> Schema {
    any([is_type(ValueType::String), is_type(ValueType::Null)])
}

/// Numeric or string identifiers, normalized to strings.
fn identifier() -> Schema {
    any([
        is_type(ValueType::Null),
        is_type(ValueType::String),
        all([
            is_type(ValueType::Int),
            transform(|value: Value| match value {
                Value::Int(id) => Ok(Value::String(id.to_string())),
                other => Err(format!("{} is not an identifier", other.type_name())),
            }),
        ]),
    ])
}

fn channel_name(key: &str) -> (KeySpec, Schema) {
    (
        required(key),
        all([
            mapping([(required("channelName"), is_type(ValueType::String))]),
            get("channelName"),
        ]),
    )
}

fn playback_media() -> Schema {
    none_or_all([
        is_type(ValueType::String),
        parse_json(),
        mapping([(
            required("media"),
            sequence_of(all([
                mapping([
                    (required("mediaId"), is_type(ValueType::String)),
                    (required("protocol"), is_type(ValueType::String)),
                    (required("path"), url()),
                ]),
                union_get(["mediaId", "protocol", "path"]),
            ])),
        )]),
        get("media"),
    ])
}

/// Content schemas of `/service/v3/channels/{channel_id}/live-detail`.
pub fn live_detail() -> Vec<Schema> {
    vec![
        mapping([
            (required("status"), is_type(ValueType::String)),
            (required("liveId"), identifier()),
            (required("liveTitle"), optional_string()),
            (required("liveCategory"), optional_string()),
            (required("adult"), is_type(ValueType::Bool)),
            channel_name("channel"),
            (required("livePlaybackJson"), playback_media()),
        ]),
        union_get([
            "livePlaybackJson",
            "status",
            "liveId",
            "channel",
            "liveCategory",
            "liveTitle",
            "adult",
        ]),
    ]
}

/// Content schemas of `/service/v2/videos/{video_id}`.
pub fn video() -> Vec<Schema> {
    vec![
        mapping([
            (required("adult"), is_type(ValueType::Bool)),
            (required("inKey"), optional_string()),
            (required("videoId"), optional_string()),
            (required("videoNo"), identifier()),
            channel_name("channel"),
            (required("videoTitle"), optional_string()),
            (optional("videoCategory"), optional_string()),
        ]),
        transform(with_null("videoCategory")),
        union_get([
            "adult",
            "inKey",
            "videoId",
            "videoNo",
            "channel",
            "videoTitle",
            "videoCategory",
        ]),
    ]
}

/// Content schemas of `/service/v1/play-info/clip/{clip_id}`.
pub fn clip() -> Vec<Schema> {
    vec![
        mapping([
            (required("adult"), is_type(ValueType::Bool)),
            (required("inKey"), optional_string()),
            (required("videoId"), optional_string()),
            (required("contentId"), identifier()),
            channel_name("ownerChannel"),
            (required("contentTitle"), optional_string()),
            (optional("clipCategory"), optional_string()),
        ]),
        transform(with_null("clipCategory")),
        union_get([
            "adult",
            "inKey",
            "videoId",
            "contentId",
            "ownerChannel",
            "contentTitle",
            "clipCategory",
        ]),
    ]
}

/// Fills an absent optional key with null so that `union_get` can read it.
fn with_null(key: &'static str) -> impl Fn(Value) -> Result<Value, String> + Send + Sync {
    move |value| match value {
        Value::Map(mut map) => {
            map.entry(key.to_string()).or_insert(Value::Null);
            Ok(Value::Map(map))
        }
        other => Err(format!("{} is not a mapping", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(schemas: Vec<Schema>, json: &str) -> Result<Value, ValidationError> {
        all(std::iter::once(parse_json()).chain(schemas)).validate(json.into())
    }

    #[test]
    fn test_live_detail() {
        let value = content(
            live_detail(),
            r#"{
                "status": "OPEN",
                "liveId": 42,
                "liveTitle": "t",
                "liveCategory": "c",
                "adult": false,
                "channel": {"channelName": "a", "channelId": "CHID"},
                "livePlaybackJson": "{\"media\":[{\"mediaId\":\"HLS\",\"protocol\":\"HLS\",\"path\":\"https://h/1/1700000000/x/c.m3u8\"}]}"
            }"#,
        )
        .unwrap();
        let detail: LiveDetail = value.into_typed().unwrap();

        assert_eq!(detail.status, "OPEN");
        assert_eq!(detail.id.as_deref(), Some("42"));
        assert_eq!(detail.author, "a");
        assert_eq!(
            detail.media,
            Some(vec![(
                "HLS".to_string(),
                "HLS".to_string(),
                "https://h/1/1700000000/x/c.m3u8".to_string()
            )])
        );
    }

    #[test]
    fn test_live_detail_without_playback() {
        let value = content(
            live_detail(),
            r#"{"status":"OPEN","liveId":1,"liveTitle":null,"liveCategory":null,"adult":true,
                "channel":{"channelName":"a"},"livePlaybackJson":null}"#,
        )
        .unwrap();
        let detail: LiveDetail = value.into_typed().unwrap();
        assert_eq!(detail.media, None);
        assert!(detail.adult);
    }

    #[test]
    fn test_live_detail_invalid_media_path() {
        let err = content(
            live_detail(),
            r#"{"status":"OPEN","liveId":1,"liveTitle":null,"liveCategory":null,"adult":false,
                "channel":{"channelName":"a"},
                "livePlaybackJson":"{\"media\":[{\"mediaId\":\"HLS\",\"protocol\":\"HLS\",\"path\":\"nope\"}]}"}"#,
        )
        .unwrap_err();
        assert_eq!(err.path_string(), "$.livePlaybackJson.media[0].path");
    }

    #[test]
    fn test_video_without_category() {
        let value = content(
            video(),
            r#"{"adult":false,"inKey":"k","videoId":"v","videoNo":7,"channel":{"channelName":"a"},"videoTitle":"t"}"#,
        )
        .unwrap();
        let info: VodInfo = value.into_typed().unwrap();
        assert_eq!(
            info,
            VodInfo {
                adult: false,
                key: Some("k".to_string()),
                video_id: Some("v".to_string()),
                id: Some("7".to_string()),
                author: "a".to_string(),
                title: Some("t".to_string()),
                category: None,
            }
        );
    }

    #[test]
    fn test_clip() {
        let value = content(
            clip(),
            r#"{"adult":true,"inKey":null,"videoId":null,"contentId":"abc",
                "ownerChannel":{"channelName":"a"},"contentTitle":"t","clipCategory":"c"}"#,
        )
        .unwrap();
        let info: VodInfo = value.into_typed().unwrap();
        assert!(info.adult);
        assert_eq!(info.key, None);
        assert_eq!(info.id.as_deref(), Some("abc"));
        assert_eq!(info.category.as_deref(), Some("c"));
    }
}
