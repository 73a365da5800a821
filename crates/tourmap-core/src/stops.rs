//! Stop records: the permissive wire form and the validated form.
//!
//! [`RawStop`] mirrors whatever the tour-data collaborator sends, with every
//! field optional. [`Stop`] is only ever produced by the stop sequencer after
//! validation, so downstream code never re-checks fields.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Stop identifier as it may appear on the wire: numeric or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    /// Interprets the raw id as a [`StopId`], if it holds an integer.
    #[must_use]
    pub fn to_stop_id(&self) -> Option<StopId> {
        match self {
            RawId::Int(n) => Some(StopId(*n)),
            RawId::Text(s) => s.trim().parse::<i64>().ok().map(StopId),
        }
    }
}

/// Unvalidated stop record as received from the tour-data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStop {
    pub id: Option<RawId>,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub status: Option<String>,
    pub photo_url: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(pub i64);

impl std::fmt::Display for StopId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    #[default]
    Open,
    InProgress,
    Delivered,
    Failed,
    Skipped,
}

impl FromStr for StopStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "open" | "pending" => Ok(StopStatus::Open),
            "in_progress" => Ok(StopStatus::InProgress),
            "delivered" | "done" => Ok(StopStatus::Delivered),
            "failed" => Ok(StopStatus::Failed),
            "skipped" => Ok(StopStatus::Skipped),
            other => Err(format!("unknown stop status '{other}'")),
        }
    }
}

impl std::fmt::Display for StopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopStatus::Open => write!(f, "open"),
            StopStatus::InProgress => write!(f, "in_progress"),
            StopStatus::Delivered => write!(f, "delivered"),
            StopStatus::Failed => write!(f, "failed"),
            StopStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// A validated stop. `address` is trimmed and never blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: StopId,
    pub customer_name: String,
    pub address: String,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub status: StopStatus,
    pub photo_url: Option<String>,
    pub position: Option<i64>,
}

/// A stop record whose fields did not have the expected types.
///
/// The id is kept when it could still be read so the rejection can name it.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedStop {
    pub id: Option<RawId>,
    pub reason: String,
}

/// One element of a stop file, parsed independently of its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub enum StopRecord {
    Parsed(RawStop),
    Malformed(MalformedStop),
}

impl StopRecord {
    #[must_use]
    pub fn as_raw(&self) -> Result<&RawStop, &MalformedStop> {
        match self {
            StopRecord::Parsed(raw) => Ok(raw),
            StopRecord::Malformed(malformed) => Err(malformed),
        }
    }

    #[must_use]
    pub fn parsed(&self) -> Option<&RawStop> {
        self.as_raw().ok()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StopsDocument<V> {
    Bare(Vec<V>),
    Wrapped { stops: Vec<V> },
}

impl<V> StopsDocument<V> {
    fn into_items(self) -> Vec<V> {
        match self {
            StopsDocument::Bare(items) | StopsDocument::Wrapped { stops: items } => items,
        }
    }
}

fn json_record(value: serde_json::Value) -> StopRecord {
    let id = value
        .get("id")
        .cloned()
        .and_then(|v| serde_json::from_value::<RawId>(v).ok());
    match serde_json::from_value::<RawStop>(value) {
        Ok(raw) => StopRecord::Parsed(raw),
        Err(e) => StopRecord::Malformed(MalformedStop {
            id,
            reason: e.to_string(),
        }),
    }
}

fn yaml_record(value: serde_yaml::Value) -> StopRecord {
    let id = value
        .get("id")
        .cloned()
        .and_then(|v| serde_yaml::from_value::<RawId>(v).ok());
    match serde_yaml::from_value::<RawStop>(value) {
        Ok(raw) => StopRecord::Parsed(raw),
        Err(e) => StopRecord::Malformed(MalformedStop {
            id,
            reason: e.to_string(),
        }),
    }
}

/// Load stop records from a JSON or YAML file.
///
/// Files ending in `.yaml`/`.yml` are parsed as YAML, anything else as JSON.
/// Both a bare array and an object with a `stops` array are accepted. Each
/// element is converted on its own: an element with mistyped fields becomes
/// [`StopRecord::Malformed`] at its original index and the rest still load.
///
/// # Errors
///
/// Returns [`ConfigError::StopsFileIo`] if the file cannot be read, or
/// [`ConfigError::StopsFileParse`] if its contents are not a list at all.
pub fn load_stops(path: &Path) -> Result<Vec<StopRecord>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StopsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let parse_err = |reason: String| ConfigError::StopsFileParse {
        path: path.display().to_string(),
        reason,
    };

    let records = if is_yaml {
        serde_yaml::from_str::<StopsDocument<serde_yaml::Value>>(&content)
            .map_err(|e| parse_err(e.to_string()))?
            .into_items()
            .into_iter()
            .map(yaml_record)
            .collect()
    } else {
        serde_json::from_str::<StopsDocument<serde_json::Value>>(&content)
            .map_err(|e| parse_err(e.to_string()))?
            .into_items()
            .into_iter()
            .map(json_record)
            .collect()
    };

    Ok(records)
}

#[cfg(test)]
#[path = "stops_test.rs"]
mod tests;
