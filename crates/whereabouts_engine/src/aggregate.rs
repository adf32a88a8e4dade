use engine_logging::{engine_debug, engine_info};
use whereabouts_core::{sort_reports, CharacterId, CharacterWhereabouts, EpisodeId, EpisodeReport};

use crate::api::ShowApi;
use crate::pool::{BoundedPool, Capacity};
use crate::types::AggregateError;

/// Walks the paginated episode listing and fans per-episode resolution out
/// through one bounded pool whose window slides across page boundaries.
pub struct Aggregator<'a> {
    api: &'a dyn ShowApi,
}

impl<'a> Aggregator<'a> {
    pub fn new(api: &'a dyn ShowApi) -> Self {
        Self { api }
    }

    /// Resolves every episode on every page and returns the full report,
    /// sorted ascending by episode id.
    ///
    /// The next page is fetched only after the current one says more remain,
    /// and the pool is shared across pages, so concurrency is never reset at
    /// a page boundary. A failing item does not cancel its in-flight
    /// siblings; the first failure observed is surfaced once the backlog
    /// drains.
    pub async fn aggregate(
        &self,
        capacity: Capacity,
    ) -> Result<Vec<EpisodeReport>, AggregateError> {
        let mut pool: BoundedPool<'a, Result<EpisodeReport, AggregateError>> =
            BoundedPool::new(capacity);
        let mut outcomes = Vec::new();

        let mut page_number = 1;
        loop {
            let page = self
                .api
                .list_episodes(page_number)
                .await
                .map_err(|source| AggregateError::Page {
                    page: page_number,
                    source,
                })?;
            engine_debug!(
                "page {page_number}/{}: {} episodes listed",
                page.info.pages,
                page.results.len()
            );
            for episode in &page.results {
                outcomes.extend(pool.submit(resolve_episode(self.api, episode.id)).await);
            }
            if page_number >= page.info.pages {
                break;
            }
            page_number += 1;
        }
        outcomes.extend(pool.drain().await);

        let mut reports = Vec::with_capacity(outcomes.len());
        let mut first_failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(report) => reports.push(report),
                Err(error) => {
                    if first_failure.is_none() {
                        first_failure = Some(error);
                    }
                }
            }
        }
        if let Some(error) = first_failure {
            return Err(error);
        }

        sort_reports(&mut reports);
        engine_info!("aggregated {} episodes at capacity {capacity}", reports.len());
        Ok(reports)
    }
}

/// Resolution of one episode: the episode record first, then each referenced
/// character in listing order. Sequential on purpose; concurrency exists
/// only across episodes, never within one episode's chain.
async fn resolve_episode(
    api: &dyn ShowApi,
    id: EpisodeId,
) -> Result<EpisodeReport, AggregateError> {
    let episode = api
        .episode(id)
        .await
        .map_err(|source| AggregateError::Episode { id, source })?;
    let character_ids = episode.character_ids();
    let mut whereabouts = Vec::with_capacity(character_ids.len());
    for character_id in character_ids {
        whereabouts.push(resolve_character(api, character_id).await?);
    }
    Ok(EpisodeReport {
        id: episode.id,
        name: episode.name,
        whereabouts,
    })
}

/// Looks up a character and, if it carries a location reference, the
/// location it points at. A character without a reference still produces an
/// entry, with the sentinel location name.
async fn resolve_character(
    api: &dyn ShowApi,
    id: CharacterId,
) -> Result<CharacterWhereabouts, AggregateError> {
    let character = api
        .character(id)
        .await
        .map_err(|source| AggregateError::Character { id, source })?;
    let Some(location_id) = character.location_id() else {
        return Ok(CharacterWhereabouts::unknown(character.name));
    };
    let location = api.location(location_id).await.map_err(|source| {
        AggregateError::ReferenceResolution {
            character_id: id,
            source,
        }
    })?;
    Ok(CharacterWhereabouts::located(character.name, location.name))
}
