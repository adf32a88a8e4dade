use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::sleep;
use whereabouts_core::UNKNOWN_LOCATION;
use whereabouts_engine::{
    Aggregator, AggregateError, ApiSettings, Capacity, CharacterRecord, EpisodeRecord, FetchError,
    LocationRecord, ObjectRef, Page, PageInfo, ReqwestApi, ResourceUrl, ShowApi,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory show with `episode_count` episodes listed `page_size` per page.
/// Episode `e` features characters `2e-1` and `2e`; character `c` lives in
/// location `c`, except that every fifth character has no location reference
/// at all. One location id can be configured to fail its lookup.
struct FakeApi {
    page_size: u64,
    episode_count: u64,
    broken_location: Option<u64>,
    episodes_fetched: AtomicUsize,
    locations_fetched: AtomicUsize,
}

impl FakeApi {
    fn new(page_size: u64, episode_count: u64) -> Self {
        Self {
            page_size,
            episode_count,
            broken_location: None,
            episodes_fetched: AtomicUsize::new(0),
            locations_fetched: AtomicUsize::new(0),
        }
    }

    fn with_broken_location(mut self, location_id: u64) -> Self {
        self.broken_location = Some(location_id);
        self
    }

    fn page_count(&self) -> u64 {
        self.episode_count.div_ceil(self.page_size)
    }
}

#[async_trait::async_trait]
impl ShowApi for FakeApi {
    async fn list_episodes(&self, page: u32) -> Result<Page, FetchError> {
        sleep(Duration::from_millis(2)).await;
        let page = u64::from(page);
        let first = (page - 1) * self.page_size + 1;
        let last = (first + self.page_size - 1).min(self.episode_count);
        Ok(Page {
            info: PageInfo {
                count: self.episode_count as u32,
                pages: self.page_count() as u32,
                next: (page < self.page_count()).then(|| format!("page={}", page + 1)),
                prev: (page > 1).then(|| format!("page={}", page - 1)),
            },
            results: (first..=last).map(|id| ObjectRef { id }).collect(),
        })
    }

    async fn episode(&self, id: u64) -> Result<EpisodeRecord, FetchError> {
        self.episodes_fetched.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(1 + id % 3)).await;
        Ok(EpisodeRecord {
            id,
            name: format!("Episode {id}"),
            characters: vec![
                format!("https://show.test/api/character/{}", 2 * id - 1),
                format!("https://show.test/api/character/{}", 2 * id),
            ],
        })
    }

    async fn character(&self, id: u64) -> Result<CharacterRecord, FetchError> {
        sleep(Duration::from_millis(1)).await;
        let url = if id % 5 == 0 {
            String::new()
        } else {
            format!("https://show.test/api/location/{id}")
        };
        Ok(CharacterRecord {
            id,
            name: format!("Character {id}"),
            location: ResourceUrl { url },
        })
    }

    async fn location(&self, id: u64) -> Result<LocationRecord, FetchError> {
        self.locations_fetched.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(1)).await;
        if self.broken_location == Some(id) {
            return Err(FetchError::HttpStatus {
                url: format!("https://show.test/api/location/{id}"),
                status: 500,
            });
        }
        Ok(LocationRecord {
            id,
            name: format!("Location {id}"),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn aggregates_three_pages_into_sorted_reports() {
    engine_logging::initialize_for_tests();

    // 3 pages: 20 + 20 + 1 episodes.
    let api = FakeApi::new(20, 41);
    let aggregator = Aggregator::new(&api);

    let reports = aggregator
        .aggregate(Capacity::limit(5).unwrap())
        .await
        .expect("aggregate ok");

    assert_eq!(reports.len(), 41);
    let ids: Vec<u64> = reports.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=41).collect::<Vec<_>>());
    assert_eq!(api.episodes_fetched.load(Ordering::SeqCst), 41);

    let first = &reports[0];
    assert_eq!(first.name, "Episode 1");
    assert_eq!(first.whereabouts.len(), 2);
    assert_eq!(first.whereabouts[0].character, "Character 1");
    assert_eq!(first.whereabouts[0].location, "Location 1");
}

#[tokio::test(start_paused = true)]
async fn characters_without_a_location_reference_get_the_sentinel() {
    let api = FakeApi::new(10, 10);
    let aggregator = Aggregator::new(&api);

    let reports = aggregator
        .aggregate(Capacity::limit(3).unwrap())
        .await
        .expect("aggregate ok");

    // Characters 5, 10, 15, 20 carry no reference.
    let sentinels: Vec<&str> = reports
        .iter()
        .flat_map(|r| &r.whereabouts)
        .filter(|w| w.location == UNKNOWN_LOCATION)
        .map(|w| w.character.as_str())
        .collect();
    assert_eq!(
        sentinels,
        vec!["Character 5", "Character 10", "Character 15", "Character 20"]
    );
}

#[tokio::test(start_paused = true)]
async fn aggregate_output_is_identical_across_runs() {
    let api = FakeApi::new(7, 20);
    let aggregator = Aggregator::new(&api);

    let first = aggregator
        .aggregate(Capacity::limit(4).unwrap())
        .await
        .expect("first run");
    let second = aggregator
        .aggregate(Capacity::limit(4).unwrap())
        .await
        .expect("second run");
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn unbounded_and_bounded_runs_agree() {
    let api = FakeApi::new(6, 13);
    let aggregator = Aggregator::new(&api);

    let bounded = aggregator
        .aggregate(Capacity::limit(2).unwrap())
        .await
        .expect("bounded");
    let unbounded = aggregator
        .aggregate(Capacity::Unbounded)
        .await
        .expect("unbounded");
    assert_eq!(bounded, unbounded);
}

#[tokio::test(start_paused = true)]
async fn reference_failure_surfaces_after_siblings_complete() {
    // Character 2 (episode 1) points at location 2, which is broken.
    let api = FakeApi::new(20, 41).with_broken_location(2);
    let aggregator = Aggregator::new(&api);

    let error = aggregator
        .aggregate(Capacity::limit(2).unwrap())
        .await
        .expect_err("aggregate must fail");

    match error {
        AggregateError::ReferenceResolution {
            character_id,
            source,
        } => {
            assert_eq!(character_id, 2);
            assert!(matches!(source, FetchError::HttpStatus { status: 500, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The failure did not cancel sibling work: every episode was still
    // fetched and resolved before the error was surfaced.
    assert_eq!(api.episodes_fetched.load(Ordering::SeqCst), 41);
    assert!(api.locations_fetched.load(Ordering::SeqCst) > 1);
}

fn episode_json(id: u64, server_uri: &str, character_ids: &[u64]) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Episode {id}"),
        "characters": character_ids
            .iter()
            .map(|c| format!("{server_uri}/api/character/{c}"))
            .collect::<Vec<_>>(),
    })
}

#[tokio::test]
async fn aggregates_end_to_end_over_http() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/api/episode"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "info": { "count": 3, "pages": 2, "next": format!("{uri}/api/episode?page=2"), "prev": null },
            "results": [ { "id": 1 }, { "id": 2 } ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/episode"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "info": { "count": 3, "pages": 2, "next": null, "prev": format!("{uri}/api/episode?page=1") },
            "results": [ { "id": 3 } ],
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/episode/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(episode_json(1, &uri, &[11])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/episode/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(episode_json(2, &uri, &[11, 12])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/episode/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(episode_json(3, &uri, &[13])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/character/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "name": "Rick Sanchez",
            "location": { "url": format!("{uri}/api/location/20") },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/character/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "name": "Morty Smith",
            "location": { "url": "" },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/character/13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 13,
            "name": "Summer Smith",
            "location": { "url": format!("{uri}/api/location/20") },
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/location/20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 20,
            "name": "Earth (Replacement Dimension)",
        })))
        .mount(&server)
        .await;

    let api = ReqwestApi::new(ApiSettings {
        base_url: format!("{uri}/api"),
        ..ApiSettings::default()
    })
    .expect("client");
    let aggregator = Aggregator::new(&api);

    let reports = aggregator
        .aggregate(Capacity::limit(2).unwrap())
        .await
        .expect("aggregate ok");

    assert_eq!(reports.len(), 3);
    assert_eq!(
        reports.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(reports[0].whereabouts[0].character, "Rick Sanchez");
    assert_eq!(
        reports[0].whereabouts[0].location,
        "Earth (Replacement Dimension)"
    );
    assert_eq!(reports[1].whereabouts[1].character, "Morty Smith");
    assert_eq!(reports[1].whereabouts[1].location, UNKNOWN_LOCATION);
}
