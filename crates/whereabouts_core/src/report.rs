use serde::Serialize;

use crate::ids::EpisodeId;

/// Placeholder location name used when a character carries no location
/// reference. Kept as a field value rather than an `Option` so every
/// character appears in the report with the same shape.
pub const UNKNOWN_LOCATION: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterWhereabouts {
    pub character: String,
    pub location: String,
}

impl CharacterWhereabouts {
    pub fn located(character: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            location: location.into(),
        }
    }

    pub fn unknown(character: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            location: UNKNOWN_LOCATION.to_string(),
        }
    }
}

/// One episode with the last known location of every character in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeReport {
    pub id: EpisodeId,
    pub name: String,
    pub whereabouts: Vec<CharacterWhereabouts>,
}

/// Completion order out of the pool is nondeterministic; the final ordering
/// is imposed here, once, by the stable numeric episode id.
pub fn sort_reports(reports: &mut [EpisodeReport]) {
    reports.sort_by_key(|report| report.id);
}
