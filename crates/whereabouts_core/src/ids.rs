use url::Url;

pub type EpisodeId = u64;
pub type CharacterId = u64;
pub type LocationId = u64;

/// Parses the numeric id from the last path segment of a resource URL,
/// e.g. `https://host/api/location/20` -> `Some(20)`.
///
/// Trailing slashes are tolerated. Returns `None` for anything that is not
/// an absolute URL ending in a numeric segment.
pub fn trailing_id(raw: &str) -> Option<u64> {
    let parsed = Url::parse(raw).ok()?;
    let segment = parsed
        .path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())?;
    segment.parse().ok()
}
