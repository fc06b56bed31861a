//! Error taxonomy shared by every layer of the crate.
//!
//! The library only recovers from two situations on its own: a video id that
//! does not resolve (see [`crate::snapshot::VideoState::NotFound`]) and ids
//! that vanish from a playlist while aggregating. Everything else ends up in
//! one of the variants below and is handed back to the caller untouched.

use std::result::Result as StdResult;

use thiserror::Error;

use crate::provider::EntityKind;

#[derive(Error, Debug)]
pub enum Error {
    /// A channel or playlist lookup came back without a single item.
    #[error("no {kind} found for id {id:?}")]
    EmptyResult { kind: EntityKind, id: String },

    /// A subscriber comparison was attempted on something that is not a channel.
    #[error("cannot compare subscribers of {left} and {right}")]
    InvalidComparison {
        left: &'static str,
        right: &'static str,
    },

    #[error("{kind} item is missing field {field:?}")]
    MissingField { kind: EntityKind, field: &'static str },

    #[error("invalid ISO 8601 duration {0:?}")]
    InvalidDuration(String),

    /// Every duration parsed, but their sum exceeds what a `TimeDelta` holds.
    #[error("total duration overflowed when adding video {video_id}")]
    DurationOverflow { video_id: String },

    #[error(transparent)]
    Transport(#[from] Box<ureq::Error>),

    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

pub type Result<T> = StdResult<T, Error>;
