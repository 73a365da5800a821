//! Validation and ordering of the raw stop list.
//!
//! [`normalize`] is the single boundary where [`RawStop`] records become
//! [`Stop`]s. A bad record is dropped and reported as [`InvalidStopData`];
//! it never aborts the rest of the batch.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tourmap_core::{MalformedStop, RawStop, Stop, StopId, StopRecord, StopStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum InvalidStopReason {
    MissingId,
    BlankAddress,
    DuplicateId,
    UnknownStatus(String),
    /// A field had the wrong type; carries the deserializer's message.
    Malformed(String),
}

impl std::fmt::Display for InvalidStopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidStopReason::MissingId => write!(f, "missing or non-numeric id"),
            InvalidStopReason::BlankAddress => write!(f, "missing or blank address"),
            InvalidStopReason::DuplicateId => write!(f, "duplicate id"),
            InvalidStopReason::UnknownStatus(status) => write!(f, "unknown status '{status}'"),
            InvalidStopReason::Malformed(detail) => write!(f, "malformed record: {detail}"),
        }
    }
}

/// A dropped stop record: where it was in the input and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("invalid stop data at index {index} (id {id:?}): {reason}")]
pub struct InvalidStopData {
    pub index: usize,
    pub id: Option<StopId>,
    pub reason: InvalidStopReason,
}

/// Result of [`normalize`]: the ordered valid stops plus every rejection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceOutcome {
    pub stops: Vec<Stop>,
    pub rejected: Vec<InvalidStopData>,
}

/// Validate raw stops and put them in display/route order.
///
/// Records with a missing id, a blank address, an already-seen id, or an
/// unrecognized status are dropped and reported. The remaining stops are
/// sorted by `position` when every one of them carries a position;
/// otherwise input order is kept. The sort is stable, so identical input
/// always yields identical output.
#[must_use]
pub fn normalize(raw_stops: &[RawStop]) -> SequenceOutcome {
    normalize_entries(raw_stops.iter().map(Ok))
}

/// Same as [`normalize`] for records loaded from a stop file. Records that
/// failed to deserialize are rejected as [`InvalidStopReason::Malformed`]
/// at their original index.
#[must_use]
pub fn normalize_records(records: &[StopRecord]) -> SequenceOutcome {
    normalize_entries(records.iter().map(StopRecord::as_raw))
}

fn normalize_entries<'a>(
    entries: impl Iterator<Item = Result<&'a RawStop, &'a MalformedStop>>,
) -> SequenceOutcome {
    let mut outcome = SequenceOutcome::default();
    let mut seen_ids = HashSet::new();

    for (index, entry) in entries.enumerate() {
        let checked = match entry {
            Ok(raw) => validate(raw, &mut seen_ids),
            Err(malformed) => Err((
                malformed.id.as_ref().and_then(tourmap_core::RawId::to_stop_id),
                InvalidStopReason::Malformed(malformed.reason.clone()),
            )),
        };
        match checked {
            Ok(stop) => outcome.stops.push(stop),
            Err((id, reason)) => {
                tracing::warn!(index, id = ?id, %reason, "dropping invalid stop record");
                outcome.rejected.push(InvalidStopData { index, id, reason });
            }
        }
    }

    if !outcome.stops.is_empty() && outcome.stops.iter().all(|s| s.position.is_some()) {
        outcome.stops.sort_by_key(|s| s.position);
    }

    outcome
}

fn validate(
    raw: &RawStop,
    seen_ids: &mut HashSet<StopId>,
) -> Result<Stop, (Option<StopId>, InvalidStopReason)> {
    let id = raw
        .id
        .as_ref()
        .and_then(tourmap_core::RawId::to_stop_id)
        .ok_or((None, InvalidStopReason::MissingId))?;

    let address = raw
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or((Some(id), InvalidStopReason::BlankAddress))?;

    let status = match raw.status.as_deref().map(str::trim) {
        None | Some("") => StopStatus::default(),
        Some(s) => s
            .parse::<StopStatus>()
            .map_err(|_| (Some(id), InvalidStopReason::UnknownStatus(s.to_owned())))?,
    };

    if !seen_ids.insert(id) {
        return Err((Some(id), InvalidStopReason::DuplicateId));
    }

    Ok(Stop {
        id,
        customer_name: raw
            .customer_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_owned(),
        address: address.to_owned(),
        phone: non_blank(raw.phone.as_deref()),
        note: non_blank(raw.note.as_deref()),
        status,
        photo_url: non_blank(raw.photo_url.as_deref()),
        position: raw.position,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "sequence_test.rs"]
mod tests;
