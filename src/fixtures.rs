//! Response items shaped like the Data API's, shared by unit tests.

use serde_json::{Value, json};

use crate::provider::{EntityKind, InMemoryProvider};

pub(crate) fn channel_item(id: &str, title: &str, subscribers: u64) -> Value {
    json!({
        "kind": "youtube#channel",
        "id": id,
        "snippet": {
            "title": title,
            "description": format!("About {title}"),
        },
        "statistics": {
            "viewCount": "987654321",
            "subscriberCount": subscribers.to_string(),
            "hiddenSubscriberCount": false,
            "videoCount": "120",
        },
    })
}

/// A video item carrying snippet, statistics and content details at once.
pub(crate) fn video_item(id: &str, likes: Option<u64>, duration: &str) -> Value {
    let mut statistics = json!({ "viewCount": "15000", "commentCount": "12" });
    if let Some(likes) = likes {
        statistics["likeCount"] = json!(likes.to_string());
    }
    json!({
        "kind": "youtube#video",
        "id": id,
        "snippet": {
            "title": format!("Video {id}"),
            "description": format!("Description of {id}"),
        },
        "contentDetails": { "duration": duration },
        "statistics": statistics,
    })
}

pub(crate) fn playlist_item(id: &str, title: &str) -> Value {
    json!({
        "kind": "youtube#playlist",
        "id": id,
        "snippet": { "title": title },
        "contentDetails": { "itemCount": 0 },
    })
}

/// Registers `(id, likes, duration)` triples as videos.
pub(crate) fn provider_with_videos(videos: &[(&str, Option<u64>, &str)]) -> InMemoryProvider {
    let mut provider = InMemoryProvider::new();
    for (id, likes, duration) in videos {
        provider.insert(EntityKind::Video, id, video_item(id, *likes, duration));
    }
    provider
}
