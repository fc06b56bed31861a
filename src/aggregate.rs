//! Summaries computed over the ordered video ids of a playlist.
//!
//! Both summaries share the same partial-failure policy: an id that no longer
//! resolves is logged and skipped instead of failing the whole run, since one
//! stale entry should not make a playlist summary unusable. Transport and
//! decoding errors still propagate.
//!
//! Lookups are batched (at most `page_size` ids per request), but the scan
//! itself walks the caller's id sequence, so every occurrence of an id is
//! counted and the playlist order decides ties.

use std::collections::HashMap;

use chrono::TimeDelta;
use log::{debug, warn};
use serde_json::Value;

use crate::{
    duration::parse_iso8601,
    error::{Error, Result},
    provider::{EntityKind, LookupRequest, MetadataProvider, clamp_page_size, items},
    snapshot::optional_count,
};

/// Sum of the durations of every resolvable entry of `video_ids`.
///
/// Unknown ids contribute nothing. An empty sequence returns zero without
/// contacting the provider.
pub fn total_duration<P, S>(provider: &P, video_ids: &[S], page_size: u32) -> Result<TimeDelta>
where
    P: MetadataProvider + ?Sized,
    S: AsRef<str>,
{
    if video_ids.is_empty() {
        return Ok(TimeDelta::zero());
    }

    let resolved = lookup_videos(provider, video_ids, &["contentDetails"], page_size)?;
    let mut total = TimeDelta::zero();
    for video_id in video_ids.iter().map(as_str) {
        let Some(item) = resolved.get(video_id) else {
            warn!("video {video_id} did not resolve; counting it as zero length");
            continue;
        };
        let encoded = item
            .pointer("/contentDetails/duration")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField {
                kind: EntityKind::Video,
                field: "/contentDetails/duration",
            })?;
        total = total
            .checked_add(&parse_iso8601(encoded)?)
            .ok_or_else(|| Error::DurationOverflow {
                video_id: video_id.to_owned(),
            })?;
    }
    Ok(total)
}

/// Id of the entry with the most likes; the earliest one wins a tie.
///
/// Entries that do not resolve, or whose like count is hidden, are never
/// candidates. Returns `None` when no entry qualifies.
pub fn best_by_likes<P, S>(provider: &P, video_ids: &[S], page_size: u32) -> Result<Option<String>>
where
    P: MetadataProvider + ?Sized,
    S: AsRef<str>,
{
    if video_ids.is_empty() {
        return Ok(None);
    }

    let resolved = lookup_videos(provider, video_ids, &["statistics"], page_size)?;
    let mut best: Option<(&str, u64)> = None;
    for video_id in video_ids.iter().map(as_str) {
        let Some(item) = resolved.get(video_id) else {
            warn!("video {video_id} did not resolve; skipping it");
            continue;
        };
        let Some(likes) = optional_count(item, EntityKind::Video, "/statistics/likeCount")? else {
            warn!("video {video_id} hides its like count; skipping it");
            continue;
        };
        // strictly greater keeps the first maximum
        if best.is_none_or(|(_, max)| likes > max) {
            best = Some((video_id, likes));
        }
    }
    Ok(best.map(|(video_id, _)| video_id.to_owned()))
}

fn as_str<S: AsRef<str>>(video_id: &S) -> &str {
    video_id.as_ref()
}

/// Resolves the distinct ids in batches and indexes the returned items by id.
fn lookup_videos<P, S>(
    provider: &P,
    video_ids: &[S],
    parts: &[&'static str],
    page_size: u32,
) -> Result<HashMap<String, Value>>
where
    P: MetadataProvider + ?Sized,
    S: AsRef<str>,
{
    let mut distinct: Vec<&str> = Vec::with_capacity(video_ids.len());
    for video_id in video_ids.iter().map(as_str) {
        if !distinct.contains(&video_id) {
            distinct.push(video_id);
        }
    }

    let mut resolved = HashMap::with_capacity(distinct.len());
    for batch in distinct.chunks(clamp_page_size(page_size) as usize) {
        debug!("looking up {} videos ({})", batch.len(), parts.join(","));
        let ids = batch.iter().map(|id| (*id).to_owned()).collect();
        let document = provider.lookup(&LookupRequest::new(EntityKind::Video, ids, parts))?;
        for item in items(&document) {
            if let Some(id) = item.get("id").and_then(Value::as_str) {
                resolved.insert(id.to_owned(), item.clone());
            }
        }
    }
    Ok(resolved)
}
