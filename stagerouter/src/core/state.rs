//! Per-stage state as persisted in a metadata record.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The recorded state of one stage for one work item.
///
/// On the wire this is a loosely typed value: `false`, `null` or an absent
/// key mean [`StageState::Skip`], `true` means [`StageState::Requested`] and a
/// string is the artifact path of a [`StageState::Completed`] stage. The value
/// is decoded into this enum at the store boundary and encoded back the same
/// way on persist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum StageState {
    /// The stage was not requested for this work item.
    #[default]
    Skip,
    /// The stage should run when reached.
    Requested,
    /// The stage finished and reported this artifact path (possibly empty).
    Completed(String),
}

impl StageState {
    /// Creates a completed state.
    #[must_use]
    pub fn completed(artifact: impl Into<String>) -> Self {
        Self::Completed(artifact.into())
    }

    /// Decodes one stage map value.
    ///
    /// Returns `None` for numbers, arrays and objects, which name no state.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(true) => Some(Self::Requested),
            serde_json::Value::Bool(false) | serde_json::Value::Null => Some(Self::Skip),
            serde_json::Value::String(path) => Some(Self::Completed(path.clone())),
            _ => None,
        }
    }

    /// Returns the artifact path if the stage has completed.
    #[must_use]
    pub fn artifact(&self) -> Option<&str> {
        match self {
            Self::Completed(path) => Some(path),
            Self::Skip | Self::Requested => None,
        }
    }

    /// Returns true if the stage is waiting to run.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::Requested)
    }

    /// Returns true if the stage has completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Requested => write!(f, "requested"),
            Self::Completed(path) => write!(f, "completed({path})"),
        }
    }
}

impl Serialize for StageState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Skip => serializer.serialize_bool(false),
            Self::Requested => serializer.serialize_bool(true),
            Self::Completed(path) => serializer.serialize_str(path),
        }
    }
}

struct StageStateVisitor;

impl<'de> Visitor<'de> for StageStateVisitor {
    type Value = StageState;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean, null, or an artifact path string")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
        Ok(if value {
            StageState::Requested
        } else {
            StageState::Skip
        })
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(StageState::Completed(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(StageState::Completed(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(StageState::Skip)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(StageState::Skip)
    }
}

impl<'de> Deserialize<'de> for StageState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StageStateVisitor)
    }
}
