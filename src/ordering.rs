//! Channel popularity by subscriber count.
//!
//! Between two [`Channel`]s the comparisons are infallible. Callers holding
//! generic [`Snapshot`]s use the free functions, which reject any operand
//! that is not a channel with [`Error::InvalidComparison`].

use std::cmp::Ordering;

use crate::{
    error::{Error, Result},
    snapshot::{Channel, Snapshot},
};

impl Channel {
    pub fn compare_subscribers(&self, other: &Channel) -> Ordering {
        self.subscriber_count().cmp(&other.subscriber_count())
    }

    pub fn greater_than(&self, other: &Channel) -> bool {
        self.compare_subscribers(other) == Ordering::Greater
    }

    pub fn less_than(&self, other: &Channel) -> bool {
        self.compare_subscribers(other) == Ordering::Less
    }

    /// Sum of both subscriber counts, widened so it cannot overflow.
    pub fn combined_subscribers(&self, other: &Channel) -> u128 {
        u128::from(self.subscriber_count()) + u128::from(other.subscriber_count())
    }
}

fn channels<'a>(left: &'a Snapshot, right: &'a Snapshot) -> Result<(&'a Channel, &'a Channel)> {
    match (left.as_channel(), right.as_channel()) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(Error::InvalidComparison {
            left: left.kind_name(),
            right: right.kind_name(),
        }),
    }
}

pub fn compare_subscribers(left: &Snapshot, right: &Snapshot) -> Result<Ordering> {
    let (left, right) = channels(left, right)?;
    Ok(left.compare_subscribers(right))
}

pub fn greater_than(left: &Snapshot, right: &Snapshot) -> Result<bool> {
    let (left, right) = channels(left, right)?;
    Ok(left.greater_than(right))
}

pub fn less_than(left: &Snapshot, right: &Snapshot) -> Result<bool> {
    let (left, right) = channels(left, right)?;
    Ok(left.less_than(right))
}

pub fn combined_subscribers(left: &Snapshot, right: &Snapshot) -> Result<u128> {
    let (left, right) = channels(left, right)?;
    Ok(left.combined_subscribers(right))
}
