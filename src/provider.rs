//! Access to the remote metadata service.
//!
//! Every snapshot and aggregate goes through the [`MetadataProvider`] trait
//! so callers decide which backend answers: the real YouTube Data API over
//! HTTP, or an in-memory table used by tests and for replaying cached
//! documents.

use std::{cell::RefCell, collections::HashMap, fmt};

use log::debug;
use serde_json::{Value, json};

use crate::error::Result;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
/// Upper bound the Data API accepts for `maxResults` and for comma-joined ids.
pub const MAX_PAGE_SIZE: u32 = 50;

/// The resource collections the crate knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Channel,
    Video,
    Playlist,
    PlaylistItems,
}

impl EntityKind {
    /// Path segment of the Data API endpoint serving this kind.
    pub fn endpoint(self) -> &'static str {
        match self {
            EntityKind::Channel => "channels",
            EntityKind::Video => "videos",
            EntityKind::Playlist => "playlists",
            EntityKind::PlaylistItems => "playlistItems",
        }
    }

    /// Top-level `kind` of the list response the endpoint returns.
    pub fn list_response_kind(self) -> &'static str {
        match self {
            EntityKind::Channel => "youtube#channelListResponse",
            EntityKind::Video => "youtube#videoListResponse",
            EntityKind::Playlist => "youtube#playlistListResponse",
            EntityKind::PlaylistItems => "youtube#playlistItemListResponse",
        }
    }

    pub fn from_list_response_kind(kind: &str) -> Option<Self> {
        [
            EntityKind::Channel,
            EntityKind::Video,
            EntityKind::Playlist,
            EntityKind::PlaylistItems,
        ]
        .into_iter()
        .find(|candidate| candidate.list_response_kind() == kind)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Channel => "channel",
            EntityKind::Video => "video",
            EntityKind::Playlist => "playlist",
            EntityKind::PlaylistItems => "playlist items",
        };
        f.write_str(label)
    }
}

/// One lookup against the provider.
///
/// For [`EntityKind::PlaylistItems`] the single id is the playlist id and
/// `max_results` bounds the page; for the other kinds the ids are sent as a
/// comma-joined batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub kind: EntityKind,
    pub ids: Vec<String>,
    pub parts: Vec<&'static str>,
    pub max_results: Option<u32>,
}

impl LookupRequest {
    pub fn new(kind: EntityKind, ids: Vec<String>, parts: &[&'static str]) -> Self {
        Self {
            kind,
            ids,
            parts: parts.to_vec(),
            max_results: None,
        }
    }

    pub fn single(kind: EntityKind, id: &str, parts: &[&'static str]) -> Self {
        Self::new(kind, vec![id.to_owned()], parts)
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(clamp_page_size(max_results));
        self
    }
}

pub fn clamp_page_size(value: u32) -> u32 {
    value.clamp(1, MAX_PAGE_SIZE)
}

/// Synchronous request/response access to channel, video and playlist data.
///
/// An id that does not resolve is not an error: it is simply missing from the
/// `items` array of the returned document.
pub trait MetadataProvider {
    fn lookup(&self, request: &LookupRequest) -> Result<Value>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for &P {
    fn lookup(&self, request: &LookupRequest) -> Result<Value> {
        (**self).lookup(request)
    }
}

/// Items of a response document; an absent or malformed `items` key reads
/// as an empty result set.
pub fn items(document: &Value) -> &[Value] {
    document
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Blocking client for the YouTube Data API v3 authenticated with an API key.
pub struct YouTubeProvider {
    agent: ureq::Agent,
    api_base_url: String,
    api_key: String,
}

impl YouTubeProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }

    fn endpoint_url(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.api_base_url, kind.endpoint())
    }
}

/// Query parameters for `request`, without the API key.
fn query_pairs(request: &LookupRequest) -> Vec<(&'static str, String)> {
    let ids_param = match request.kind {
        EntityKind::PlaylistItems => "playlistId",
        _ => "id",
    };
    let mut pairs = vec![
        ("part", request.parts.join(",")),
        (ids_param, request.ids.join(",")),
    ];
    if let Some(max_results) = request.max_results {
        pairs.push(("maxResults", max_results.to_string()));
    }
    pairs
}

impl MetadataProvider for YouTubeProvider {
    fn lookup(&self, request: &LookupRequest) -> Result<Value> {
        let url = self.endpoint_url(request.kind);
        let pairs = query_pairs(request);
        debug!("GET {url} {pairs:?}");

        let mut call = self.agent.get(&url).query("key", &self.api_key);
        for (name, value) in &pairs {
            call = call.query(name, value);
        }

        let response = call.call()?;
        let document: Value = serde_json::from_reader(response.into_reader())?;
        Ok(document)
    }
}

/// Provider answering from documents held in memory.
///
/// Items are registered per kind and id; playlist items are registered per
/// playlist id as an ordered list. Every request is recorded so callers can
/// check how many round trips an operation needed.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    items: HashMap<(EntityKind, String), Vec<Value>>,
    requests: RefCell<Vec<LookupRequest>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single channel, video or playlist item under `id`.
    pub fn insert(&mut self, kind: EntityKind, id: &str, item: Value) {
        self.items.insert((kind, id.to_owned()), vec![item]);
    }

    /// Registers every item of a previously fetched document under the
    /// item's own `id` field.
    pub fn insert_document(&mut self, kind: EntityKind, document: &Value) {
        for item in items(document) {
            if let Some(id) = item.get("id").and_then(Value::as_str) {
                self.insert(kind, id, item.clone());
            }
        }
    }

    /// Registers a playlist-items document for `playlist_id`, keeping the
    /// item order.
    pub fn insert_playlist_items_document(&mut self, playlist_id: &str, document: &Value) {
        self.items.insert(
            (EntityKind::PlaylistItems, playlist_id.to_owned()),
            items(document).to_vec(),
        );
    }

    /// Shorthand registering the playlist order as bare `contentDetails` items.
    pub fn insert_playlist_entries(&mut self, playlist_id: &str, video_ids: &[&str]) {
        let entries = video_ids
            .iter()
            .map(|video_id| {
                json!({
                    "kind": "youtube#playlistItem",
                    "snippet": { "playlistId": playlist_id },
                    "contentDetails": { "videoId": video_id },
                })
            })
            .collect();
        self.items
            .insert((EntityKind::PlaylistItems, playlist_id.to_owned()), entries);
    }

    /// Registers a cached list response according to its top-level `kind`.
    /// Playlist items are filed under the `snippet.playlistId` of their
    /// entries. Returns the kind, or `None` when the document is not a
    /// recognisable list response.
    pub fn insert_cached(&mut self, document: &Value) -> Option<EntityKind> {
        let kind = document
            .get("kind")
            .and_then(Value::as_str)
            .and_then(EntityKind::from_list_response_kind)?;
        match kind {
            EntityKind::PlaylistItems => {
                let playlist_id = items(document)
                    .iter()
                    .find_map(|entry| entry.pointer("/snippet/playlistId"))
                    .and_then(Value::as_str)?
                    .to_owned();
                self.insert_playlist_items_document(&playlist_id, document);
            }
            _ => self.insert_document(kind, document),
        }
        Some(kind)
    }

    pub fn requests(&self) -> Vec<LookupRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl MetadataProvider for InMemoryProvider {
    fn lookup(&self, request: &LookupRequest) -> Result<Value> {
        self.requests.borrow_mut().push(request.clone());

        let mut seen = Vec::new();
        let mut found = Vec::new();
        for id in &request.ids {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            if let Some(stored) = self.items.get(&(request.kind, id.clone())) {
                found.extend(stored.iter().cloned());
            }
        }
        if let Some(max_results) = request.max_results {
            found.truncate(max_results as usize);
        }

        Ok(json!({
            "kind": request.kind.list_response_kind(),
            "pageInfo": { "totalResults": found.len() },
            "items": found,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_items_request_uses_page_bound() {
        let request = LookupRequest::single(EntityKind::PlaylistItems, "PL1", &["contentDetails"])
            .with_max_results(500);
        assert_eq!(request.max_results, Some(MAX_PAGE_SIZE));
        assert_eq!(
            LookupRequest::single(EntityKind::PlaylistItems, "PL1", &[])
                .with_max_results(0)
                .max_results,
            Some(1)
        );
    }

    #[test]
    fn items_tolerates_missing_key() {
        assert!(items(&json!({ "kind": "youtube#videoListResponse" })).is_empty());
        assert_eq!(items(&json!({ "items": [1, 2] })).len(), 2);
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let provider = YouTubeProvider::with_base_url("key", "http://localhost:9000/v3/");
        assert_eq!(
            provider.endpoint_url(EntityKind::PlaylistItems),
            "http://localhost:9000/v3/playlistItems"
        );
    }

    #[test]
    fn video_batch_is_sent_as_comma_joined_ids() {
        let request = LookupRequest::new(
            EntityKind::Video,
            vec!["a".into(), "b".into()],
            &["contentDetails"],
        );
        let pairs = query_pairs(&request);
        assert_eq!(
            pairs,
            vec![("part", "contentDetails".to_string()), ("id", "a,b".to_string())]
        );
        assert!(pairs.iter().all(|(name, _)| *name != "maxResults"));
    }

    #[test]
    fn playlist_items_are_queried_by_playlist_id_with_page_bound() {
        let request = LookupRequest::single(EntityKind::PlaylistItems, "PL1", &["contentDetails"])
            .with_max_results(MAX_PAGE_SIZE);
        let pairs = query_pairs(&request);
        assert_eq!(
            pairs,
            vec![
                ("part", "contentDetails".to_string()),
                ("playlistId", "PL1".to_string()),
                ("maxResults", "50".to_string()),
            ]
        );
    }

    #[test]
    fn list_response_kinds_map_back_to_entity_kinds() {
        for kind in [
            EntityKind::Channel,
            EntityKind::Video,
            EntityKind::Playlist,
            EntityKind::PlaylistItems,
        ] {
            assert_eq!(
                EntityKind::from_list_response_kind(kind.list_response_kind()),
                Some(kind)
            );
        }
        assert_eq!(EntityKind::from_list_response_kind("youtube#searchListResponse"), None);
    }

    #[test]
    fn insert_cached_files_documents_by_kind() -> Result<()> {
        let mut live = InMemoryProvider::new();
        live.insert(EntityKind::Channel, "UC1", json!({ "id": "UC1" }));
        live.insert_playlist_entries("PL1", &["v2", "v1"]);
        let channel_doc =
            live.lookup(&LookupRequest::single(EntityKind::Channel, "UC1", &["snippet"]))?;
        let entries_doc = live.lookup(&LookupRequest::single(
            EntityKind::PlaylistItems,
            "PL1",
            &["snippet", "contentDetails"],
        ))?;

        let mut replay = InMemoryProvider::new();
        assert_eq!(replay.insert_cached(&channel_doc), Some(EntityKind::Channel));
        assert_eq!(replay.insert_cached(&entries_doc), Some(EntityKind::PlaylistItems));
        assert_eq!(replay.insert_cached(&json!({ "items": [] })), None);

        let replayed = replay.lookup(&LookupRequest::single(
            EntityKind::PlaylistItems,
            "PL1",
            &["contentDetails"],
        ))?;
        assert_eq!(items(&replayed), items(&entries_doc));
        Ok(())
    }

    #[test]
    fn in_memory_lookup_skips_unknown_and_repeated_ids() -> Result<()> {
        let mut provider = InMemoryProvider::new();
        provider.insert(EntityKind::Video, "a", json!({ "id": "a" }));
        provider.insert(EntityKind::Video, "b", json!({ "id": "b" }));

        let request = LookupRequest::new(
            EntityKind::Video,
            vec!["b".into(), "missing".into(), "a".into(), "b".into()],
            &["statistics"],
        );
        let document = provider.lookup(&request)?;
        let ids: Vec<_> = items(&document)
            .iter()
            .filter_map(|item| item["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(provider.request_count(), 1);
        assert_eq!(provider.requests()[0], request);
        Ok(())
    }

    #[test]
    fn in_memory_playlist_items_keep_order_and_truncate() -> Result<()> {
        let mut provider = InMemoryProvider::new();
        provider.insert_playlist_entries("PL1", &["v3", "v1", "v2"]);

        let request = LookupRequest::single(EntityKind::PlaylistItems, "PL1", &["contentDetails"])
            .with_max_results(2);
        let document = provider.lookup(&request)?;
        let ids: Vec<_> = items(&document)
            .iter()
            .filter_map(|item| item["contentDetails"]["videoId"].as_str())
            .collect();
        assert_eq!(ids, vec!["v3", "v1"]);
        Ok(())
    }

    #[test]
    fn insert_document_indexes_items_by_id() -> Result<()> {
        let mut provider = InMemoryProvider::new();
        provider.insert_document(
            EntityKind::Channel,
            &json!({ "items": [{ "id": "UC1" }, { "id": "UC2" }, { "title": "no id" }] }),
        );
        let document =
            provider.lookup(&LookupRequest::single(EntityKind::Channel, "UC2", &["snippet"]))?;
        assert_eq!(items(&document), &[json!({ "id": "UC2" })]);
        Ok(())
    }
}
