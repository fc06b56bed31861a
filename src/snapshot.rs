//! Immutable snapshots of channels, videos and playlists.
//!
//! Each snapshot is built by an explicit `fetch` factory that performs its
//! provider lookups up front and assigns every field at once, so a caller
//! never sees a half-populated value. The raw response is kept next to the
//! decoded fields so it can be persisted verbatim through a
//! [`crate::cache::CacheSink`].
//!
//! Channels and playlists must resolve; an unknown id is an
//! [`Error::EmptyResult`]. Videos may legitimately be probed with ids that no
//! longer exist and degrade into [`VideoState::NotFound`] instead.

use std::fmt;

use log::{debug, info};
use serde_json::Value;

use crate::{
    aggregate,
    error::{Error, Result},
    provider::{EntityKind, LookupRequest, MAX_PAGE_SIZE, MetadataProvider, clamp_page_size, items},
};

pub const CHANNEL_URL_BASE: &str = "https://www.youtube.com/channel/";
pub const PLAYLIST_URL_BASE: &str = "https://www.youtube.com/playlist?list=";
pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

const CHANNEL_PARTS: &[&str] = &["snippet", "statistics"];
const VIDEO_PARTS: &[&str] = &["snippet", "statistics"];
const PLAYLIST_PARTS: &[&str] = &["snippet", "contentDetails"];
const PLAYLIST_ITEM_PARTS: &[&str] = &["snippet", "contentDetails"];

pub fn channel_url(channel_id: &str) -> String {
    format!("{CHANNEL_URL_BASE}{channel_id}")
}

pub fn playlist_url(playlist_id: &str) -> String {
    format!("{PLAYLIST_URL_BASE}{playlist_id}")
}

pub fn video_url(video_id: &str) -> String {
    format!("{WATCH_URL_BASE}{video_id}")
}

/// Channel descriptor with its subscriber statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    id: String,
    title: String,
    description: String,
    url: String,
    subscriber_count: u64,
    video_count: u64,
    view_count: String,
    document: Value,
}

impl Channel {
    pub fn fetch<P: MetadataProvider + ?Sized>(provider: &P, channel_id: &str) -> Result<Self> {
        debug!("fetching channel {channel_id}");
        let request = LookupRequest::single(EntityKind::Channel, channel_id, CHANNEL_PARTS);
        let document = provider.lookup(&request)?;
        Self::from_document(channel_id, document)
    }

    /// Decodes a `channels` response without touching the provider.
    pub fn from_document(channel_id: &str, document: Value) -> Result<Self> {
        let kind = EntityKind::Channel;
        let item = first_item(&document, kind, channel_id)?;

        let title = text_field(item, kind, "/snippet/title")?.to_owned();
        let description = text_field(item, kind, "/snippet/description")?.to_owned();
        let subscriber_count = required_count(item, kind, "/statistics/subscriberCount")?;
        let video_count = required_count(item, kind, "/statistics/videoCount")?;
        // Lifetime views overflow what some consumers can represent, so the
        // digits are kept exactly as the API sent them.
        let view_count = match item.pointer("/statistics/viewCount") {
            Some(Value::String(digits)) => digits.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => {
                return Err(Error::MissingField {
                    kind,
                    field: "/statistics/viewCount",
                });
            }
        };

        Ok(Self {
            id: channel_id.to_owned(),
            title,
            description,
            url: channel_url(channel_id),
            subscriber_count,
            video_count,
            view_count,
            document,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn subscriber_count(&self) -> u64 {
        self.subscriber_count
    }

    pub fn video_count(&self) -> u64 {
        self.video_count
    }

    pub fn view_count(&self) -> &str {
        &self.view_count
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "YouTube channel: {}", self.title)
    }
}

/// Fields known once a video lookup resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDetails {
    pub title: String,
    pub description: String,
    /// `None` when the uploader hid the statistic.
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoState {
    Populated(VideoDetails),
    /// The id did not resolve. Every derived field reads as `None`.
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    id: String,
    state: VideoState,
    document: Option<Value>,
}

impl Video {
    /// Looks the video up once. An unknown id yields a [`VideoState::NotFound`]
    /// snapshot rather than an error; transport failures still propagate.
    pub fn fetch<P: MetadataProvider + ?Sized>(provider: &P, video_id: &str) -> Result<Self> {
        debug!("fetching video {video_id}");
        let request = LookupRequest::single(EntityKind::Video, video_id, VIDEO_PARTS);
        let document = provider.lookup(&request)?;
        Self::from_document(video_id, document)
    }

    pub fn from_document(video_id: &str, document: Value) -> Result<Self> {
        let kind = EntityKind::Video;
        let Some(item) = items(&document).first() else {
            info!("video {video_id} not found");
            return Ok(Self {
                id: video_id.to_owned(),
                state: VideoState::NotFound,
                document: None,
            });
        };

        let details = VideoDetails {
            title: text_field(item, kind, "/snippet/title")?.to_owned(),
            description: text_field(item, kind, "/snippet/description")?.to_owned(),
            view_count: optional_count(item, kind, "/statistics/viewCount")?,
            like_count: optional_count(item, kind, "/statistics/likeCount")?,
        };

        Ok(Self {
            id: video_id.to_owned(),
            state: VideoState::Populated(details),
            document: Some(document),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &VideoState {
        &self.state
    }

    pub fn is_found(&self) -> bool {
        matches!(self.state, VideoState::Populated(_))
    }

    fn details(&self) -> Option<&VideoDetails> {
        match &self.state {
            VideoState::Populated(details) => Some(details),
            VideoState::NotFound => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.details().map(|details| details.title.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.details().map(|details| details.description.as_str())
    }

    pub fn view_count(&self) -> Option<u64> {
        self.details().and_then(|details| details.view_count)
    }

    pub fn like_count(&self) -> Option<u64> {
        self.details().and_then(|details| details.like_count)
    }

    pub fn url(&self) -> String {
        video_url(&self.id)
    }

    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }
}

impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title() {
            Some(title) => write!(f, "Video: {title}"),
            None => f.write_str("Video: <not found>"),
        }
    }
}

/// A video seen through the playlist it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistVideo {
    video: Video,
    playlist_id: String,
    playlist_name: String,
}

impl PlaylistVideo {
    /// Two lookups: the video first, then the playlist for its title. The
    /// video may be [`VideoState::NotFound`]; the playlist must resolve.
    pub fn fetch<P: MetadataProvider + ?Sized>(
        provider: &P,
        video_id: &str,
        playlist_id: &str,
    ) -> Result<Self> {
        let video = Video::fetch(provider, video_id)?;

        debug!("fetching playlist {playlist_id} for video {video_id}");
        let request = LookupRequest::single(EntityKind::Playlist, playlist_id, &["snippet"]);
        let document = provider.lookup(&request)?;
        let item = first_item(&document, EntityKind::Playlist, playlist_id)?;
        let playlist_name = text_field(item, EntityKind::Playlist, "/snippet/title")?.to_owned();

        Ok(Self {
            video,
            playlist_id: playlist_id.to_owned(),
            playlist_name,
        })
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    pub fn playlist_name(&self) -> &str {
        &self.playlist_name
    }
}

impl fmt::Display for PlaylistVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.video, self.playlist_name)
    }
}

/// Playlist title plus the ordered ids of its first page of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    id: String,
    title: String,
    url: String,
    video_ids: Vec<String>,
    page_size: u32,
    descriptor: Value,
    document: Value,
}

impl Playlist {
    pub fn fetch<P: MetadataProvider + ?Sized>(provider: &P, playlist_id: &str) -> Result<Self> {
        Self::fetch_with_page_size(provider, playlist_id, MAX_PAGE_SIZE)
    }

    /// Looks up the playlist, then one page of at most `page_size` entries.
    /// Entries beyond that page are not followed.
    pub fn fetch_with_page_size<P: MetadataProvider + ?Sized>(
        provider: &P,
        playlist_id: &str,
        page_size: u32,
    ) -> Result<Self> {
        let page_size = clamp_page_size(page_size);
        debug!("fetching playlist {playlist_id}");

        let request = LookupRequest::single(EntityKind::Playlist, playlist_id, PLAYLIST_PARTS);
        let descriptor = provider.lookup(&request)?;
        let item = first_item(&descriptor, EntityKind::Playlist, playlist_id)?;
        let title = text_field(item, EntityKind::Playlist, "/snippet/title")?.to_owned();

        let request =
            LookupRequest::single(EntityKind::PlaylistItems, playlist_id, PLAYLIST_ITEM_PARTS)
                .with_max_results(page_size);
        let document = provider.lookup(&request)?;
        let video_ids = items(&document)
            .iter()
            .map(|entry| {
                text_field(entry, EntityKind::PlaylistItems, "/contentDetails/videoId")
                    .map(str::to_owned)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: playlist_id.to_owned(),
            title,
            url: playlist_url(playlist_id),
            video_ids,
            page_size,
            descriptor,
            document,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Entry ids in playlist order, duplicates included.
    pub fn video_ids(&self) -> &[String] {
        &self.video_ids
    }

    /// The playlist-items response the entry ids were read from.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The playlists response the title was read from.
    pub fn descriptor_document(&self) -> &Value {
        &self.descriptor
    }

    pub fn total_duration<P: MetadataProvider + ?Sized>(
        &self,
        provider: &P,
    ) -> Result<chrono::TimeDelta> {
        aggregate::total_duration(provider, &self.video_ids, self.page_size)
    }

    pub fn best_video<P: MetadataProvider + ?Sized>(&self, provider: &P) -> Result<Option<String>> {
        aggregate::best_by_likes(provider, &self.video_ids, self.page_size)
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Playlist: {}", self.title)
    }
}

/// Any snapshot, for callers handling entities generically.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Channel(Channel),
    Video(Video),
    PlaylistVideo(PlaylistVideo),
    Playlist(Playlist),
}

impl Snapshot {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Snapshot::Channel(_) => "channel",
            Snapshot::Video(_) => "video",
            Snapshot::PlaylistVideo(_) => "playlist video",
            Snapshot::Playlist(_) => "playlist",
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            Snapshot::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    /// The raw provider document, absent for videos that were not found.
    pub fn document(&self) -> Option<&Value> {
        match self {
            Snapshot::Channel(channel) => Some(channel.document()),
            Snapshot::Video(video) => video.document(),
            Snapshot::PlaylistVideo(entry) => entry.video().document(),
            Snapshot::Playlist(playlist) => Some(playlist.document()),
        }
    }
}

impl From<Channel> for Snapshot {
    fn from(channel: Channel) -> Self {
        Snapshot::Channel(channel)
    }
}

impl From<Video> for Snapshot {
    fn from(video: Video) -> Self {
        Snapshot::Video(video)
    }
}

impl From<PlaylistVideo> for Snapshot {
    fn from(entry: PlaylistVideo) -> Self {
        Snapshot::PlaylistVideo(entry)
    }
}

impl From<Playlist> for Snapshot {
    fn from(playlist: Playlist) -> Self {
        Snapshot::Playlist(playlist)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Snapshot::Channel(channel) => fmt::Display::fmt(channel, f),
            Snapshot::Video(video) => fmt::Display::fmt(video, f),
            Snapshot::PlaylistVideo(entry) => fmt::Display::fmt(entry, f),
            Snapshot::Playlist(playlist) => fmt::Display::fmt(playlist, f),
        }
    }
}

fn first_item<'a>(document: &'a Value, kind: EntityKind, id: &str) -> Result<&'a Value> {
    items(document).first().ok_or_else(|| Error::EmptyResult {
        kind,
        id: id.to_owned(),
    })
}

fn text_field<'a>(item: &'a Value, kind: EntityKind, pointer: &'static str) -> Result<&'a str> {
    item.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or(Error::MissingField {
            kind,
            field: pointer,
        })
}

/// Statistics arrive as decimal strings; plain JSON numbers are accepted too.
pub(crate) fn optional_count(
    item: &Value,
    kind: EntityKind,
    pointer: &'static str,
) -> Result<Option<u64>> {
    match item.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(digits)) => digits.parse().map(Some).map_err(|_| Error::MissingField {
            kind,
            field: pointer,
        }),
        Some(Value::Number(number)) => number.as_u64().map(Some).ok_or(Error::MissingField {
            kind,
            field: pointer,
        }),
        Some(_) => Err(Error::MissingField {
            kind,
            field: pointer,
        }),
    }
}

fn required_count(item: &Value, kind: EntityKind, pointer: &'static str) -> Result<u64> {
    optional_count(item, kind, pointer)?.ok_or(Error::MissingField {
        kind,
        field: pointer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{channel_item, playlist_item, video_item};
    use crate::provider::InMemoryProvider;
    use serde_json::json;

    #[test]
    fn channel_fetch_populates_fields() -> Result<()> {
        let mut provider = InMemoryProvider::new();
        provider.insert(
            EntityKind::Channel,
            "UCsT0YIqwnpJCM-mx7-gSA4Q",
            channel_item("UCsT0YIqwnpJCM-mx7-gSA4Q", "TEDx Talks", 38_000_000),
        );

        let channel = Channel::fetch(&provider, "UCsT0YIqwnpJCM-mx7-gSA4Q")?;
        assert_eq!(channel.title(), "TEDx Talks");
        assert_eq!(channel.description(), "About TEDx Talks");
        assert_eq!(channel.subscriber_count(), 38_000_000);
        assert_eq!(channel.video_count(), 120);
        assert_eq!(
            channel.url(),
            "https://www.youtube.com/channel/UCsT0YIqwnpJCM-mx7-gSA4Q"
        );
        assert_eq!(channel.to_string(), "YouTube channel: TEDx Talks");
        assert_eq!(provider.request_count(), 1);
        assert_eq!(provider.requests()[0].parts, vec!["snippet", "statistics"]);
        Ok(())
    }

    #[test]
    fn channel_keeps_large_view_count_digits() -> Result<()> {
        let mut item = channel_item("UC1", "Big", 1);
        item["statistics"]["viewCount"] = json!("123456789012345678901234567890");
        let channel = Channel::from_document("UC1", json!({ "items": [item] }))?;
        assert_eq!(channel.view_count(), "123456789012345678901234567890");
        Ok(())
    }

    #[test]
    fn unknown_channel_is_an_empty_result() {
        let provider = InMemoryProvider::new();
        let err = Channel::fetch(&provider, "UCnope").unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyResult { kind: EntityKind::Channel, ref id } if id == "UCnope"
        ));
    }

    #[test]
    fn channel_without_subscriber_count_is_rejected() {
        let mut item = channel_item("UC1", "Hidden", 1);
        item["statistics"]
            .as_object_mut()
            .unwrap()
            .remove("subscriberCount");
        let err = Channel::from_document("UC1", json!({ "items": [item] })).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                field: "/statistics/subscriberCount",
                ..
            }
        ));
    }

    #[test]
    fn video_fetch_populates_fields() -> Result<()> {
        let mut provider = InMemoryProvider::new();
        provider.insert(
            EntityKind::Video,
            "9lO06Zxhu88",
            video_item("9lO06Zxhu88", Some(1_500), "PT4M2S"),
        );

        let video = Video::fetch(&provider, "9lO06Zxhu88")?;
        assert!(video.is_found());
        assert_eq!(video.title(), Some("Video 9lO06Zxhu88"));
        assert_eq!(video.description(), Some("Description of 9lO06Zxhu88"));
        assert_eq!(video.view_count(), Some(15_000));
        assert_eq!(video.like_count(), Some(1_500));
        assert_eq!(video.url(), "https://www.youtube.com/watch?v=9lO06Zxhu88");
        assert_eq!(video.to_string(), "Video: Video 9lO06Zxhu88");
        assert!(video.document().is_some());
        Ok(())
    }

    #[test]
    fn unknown_video_degrades_to_not_found() -> Result<()> {
        let provider = InMemoryProvider::new();
        let video = Video::fetch(&provider, "9lO06Zxhu8")?;

        assert_eq!(video.state(), &VideoState::NotFound);
        assert_eq!(video.id(), "9lO06Zxhu8");
        assert_eq!(video.title(), None);
        assert_eq!(video.description(), None);
        assert_eq!(video.view_count(), None);
        assert_eq!(video.like_count(), None);
        assert!(video.document().is_none());
        assert_eq!(video.to_string(), "Video: <not found>");
        Ok(())
    }

    #[test]
    fn video_with_hidden_likes_keeps_other_fields() -> Result<()> {
        let video = Video::from_document(
            "v1",
            json!({ "items": [video_item("v1", None, "PT1M")] }),
        )?;
        assert_eq!(video.like_count(), None);
        assert_eq!(video.view_count(), Some(15_000));
        Ok(())
    }

    #[test]
    fn playlist_video_composes_video_and_playlist_name() -> Result<()> {
        let mut provider = InMemoryProvider::new();
        provider.insert(EntityKind::Video, "BBotskuyw_M", video_item("BBotskuyw_M", Some(3), "PT1M"));
        provider.insert(EntityKind::Playlist, "PL7N", playlist_item("PL7N", "Moscow Python"));

        let entry = PlaylistVideo::fetch(&provider, "BBotskuyw_M", "PL7N")?;
        assert_eq!(entry.playlist_id(), "PL7N");
        assert_eq!(entry.playlist_name(), "Moscow Python");
        assert_eq!(entry.video().like_count(), Some(3));
        assert_eq!(entry.to_string(), "Video: Video BBotskuyw_M (Moscow Python)");

        let kinds: Vec<_> = provider.requests().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Video, EntityKind::Playlist]);
        Ok(())
    }

    #[test]
    fn playlist_video_requires_known_playlist() {
        let mut provider = InMemoryProvider::new();
        provider.insert(EntityKind::Video, "v1", video_item("v1", Some(3), "PT1M"));
        let err = PlaylistVideo::fetch(&provider, "v1", "PLnope").unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyResult {
                kind: EntityKind::Playlist,
                ..
            }
        ));
    }

    #[test]
    fn playlist_fetch_preserves_entry_order_and_duplicates() -> Result<()> {
        let mut provider = InMemoryProvider::new();
        provider.insert(EntityKind::Playlist, "PLd", playlist_item("PLd", "Sketches"));
        provider.insert_playlist_entries("PLd", &["c", "a", "c", "b"]);

        let playlist = Playlist::fetch(&provider, "PLd")?;
        assert_eq!(playlist.title(), "Sketches");
        assert_eq!(playlist.url(), "https://www.youtube.com/playlist?list=PLd");
        assert_eq!(playlist.video_ids(), &["c", "a", "c", "b"]);
        assert_eq!(playlist.to_string(), "Playlist: Sketches");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].kind, EntityKind::PlaylistItems);
        assert_eq!(requests[1].max_results, Some(MAX_PAGE_SIZE));
        Ok(())
    }

    #[test]
    fn playlist_reads_a_single_bounded_page() -> Result<()> {
        let mut provider = InMemoryProvider::new();
        provider.insert(EntityKind::Playlist, "PLd", playlist_item("PLd", "Sketches"));
        provider.insert_playlist_entries("PLd", &["a", "b", "c", "d"]);

        let playlist = Playlist::fetch_with_page_size(&provider, "PLd", 3)?;
        assert_eq!(playlist.video_ids(), &["a", "b", "c"]);
        assert_eq!(provider.request_count(), 2);
        Ok(())
    }

    #[test]
    fn unknown_playlist_is_an_empty_result() {
        let provider = InMemoryProvider::new();
        let err = Playlist::fetch(&provider, "PLnope").unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyResult {
                kind: EntityKind::Playlist,
                ..
            }
        ));
        assert_eq!(provider.request_count(), 1);
    }

    #[test]
    fn snapshot_exposes_kind_and_document() -> Result<()> {
        let channel =
            Channel::from_document("UC1", json!({ "items": [channel_item("UC1", "One", 5)] }))?;
        let snapshot = Snapshot::from(channel.clone());
        assert_eq!(snapshot.kind_name(), "channel");
        assert_eq!(snapshot.as_channel(), Some(&channel));
        assert_eq!(snapshot.document(), Some(channel.document()));

        let missing = Snapshot::from(Video::from_document("v", json!({ "items": [] }))?);
        assert_eq!(missing.kind_name(), "video");
        assert!(missing.as_channel().is_none());
        assert!(missing.document().is_none());
        Ok(())
    }
}
