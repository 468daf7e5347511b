use serde::{Deserialize, Serialize};

use crate::api::InterventionRecord;

/// Used when a spec arrives without an explicit duration.
pub const DEFAULT_DURATION_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum InterventionKind {
    Breathing,
    Stretch,
    Posture,
    Dnd,
    Microbreak,
    Other,
}

impl InterventionKind {
    /// Kinds with a dedicated script, in the order the mock API rotates them.
    pub const SCRIPTED: [InterventionKind; 5] = [
        InterventionKind::Breathing,
        InterventionKind::Stretch,
        InterventionKind::Posture,
        InterventionKind::Dnd,
        InterventionKind::Microbreak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionKind::Breathing => "breathing",
            InterventionKind::Stretch => "stretch",
            InterventionKind::Posture => "posture",
            InterventionKind::Dnd => "dnd",
            InterventionKind::Microbreak => "microbreak",
            InterventionKind::Other => "other",
        }
    }

    /// Never fails: unrecognised tags map to `Other`.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "breathing" => InterventionKind::Breathing,
            "stretch" => InterventionKind::Stretch,
            "posture" => InterventionKind::Posture,
            "dnd" => InterventionKind::Dnd,
            "microbreak" => InterventionKind::Microbreak,
            _ => InterventionKind::Other,
        }
    }
}

impl From<String> for InterventionKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<InterventionKind> for String {
    fn from(kind: InterventionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for InterventionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A session to run. Validated when the session starts, not here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InterventionSpec {
    pub kind: InterventionKind,
    #[serde(default = "default_duration_ms")]
    pub total_duration_ms: u64,
}

fn default_duration_ms() -> u64 {
    DEFAULT_DURATION_MS
}

impl InterventionSpec {
    pub fn new(kind: InterventionKind, total_duration_ms: u64) -> Self {
        Self {
            kind,
            total_duration_ms,
        }
    }
}

impl From<&InterventionRecord> for InterventionSpec {
    fn from(record: &InterventionRecord) -> Self {
        Self::new(record.kind, record.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_parse_as_other() {
        assert_eq!(InterventionKind::parse("foo"), InterventionKind::Other);
        assert_eq!(InterventionKind::parse(""), InterventionKind::Other);
        assert_eq!(InterventionKind::parse(" DND "), InterventionKind::Dnd);
    }

    #[test]
    fn spec_deserializes_with_default_duration() {
        let spec: InterventionSpec = serde_json::from_str(r#"{"kind":"stretch"}"#).unwrap();
        assert_eq!(spec, InterventionSpec::new(InterventionKind::Stretch, 30_000));

        let spec: InterventionSpec =
            serde_json::from_str(r#"{"kind":"foo","totalDurationMs":1200}"#).unwrap();
        assert_eq!(spec.kind, InterventionKind::Other);
        assert_eq!(spec.total_duration_ms, 1200);
    }

    #[test]
    fn kind_serializes_as_lowercase_tag() {
        let json = serde_json::to_string(&InterventionKind::Microbreak).unwrap();
        assert_eq!(json, r#""microbreak""#);
    }
}
