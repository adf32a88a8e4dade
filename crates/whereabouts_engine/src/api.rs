use std::time::Duration;

use engine_logging::engine_trace;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use whereabouts_core::{trailing_id, CharacterId, EpisodeId, LocationId};

use crate::types::FetchError;

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL of the show API, without a trailing slash.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://rickandmortyapi.com/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    pub count: u32,
    pub pages: u32,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// One entry of a listing page: just enough to know what to fetch next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ObjectRef {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub info: PageInfo,
    pub results: Vec<ObjectRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeRecord {
    pub id: EpisodeId,
    pub name: String,
    /// Resource URLs of the characters appearing in this episode.
    pub characters: Vec<String>,
}

impl EpisodeRecord {
    /// Character ids referenced by this episode, in listing order.
    /// References that do not parse as resource URLs are skipped.
    pub fn character_ids(&self) -> Vec<CharacterId> {
        self.characters
            .iter()
            .filter_map(|url| trailing_id(url))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharacterRecord {
    pub id: CharacterId,
    pub name: String,
    pub location: ResourceUrl,
}

impl CharacterRecord {
    /// Id of the referenced location. An empty URL means the character has
    /// no known location.
    pub fn location_id(&self) -> Option<LocationId> {
        if self.location.url.is_empty() {
            return None;
        }
        trailing_id(&self.location.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub name: String,
}

/// Typed lookups against the show API. The aggregator only sees this seam,
/// so tests can substitute an in-memory implementation.
#[async_trait::async_trait]
pub trait ShowApi: Send + Sync {
    async fn list_episodes(&self, page: u32) -> Result<Page, FetchError>;
    async fn episode(&self, id: EpisodeId) -> Result<EpisodeRecord, FetchError>;
    async fn character(&self, id: CharacterId) -> Result<CharacterRecord, FetchError>;
    async fn location(&self, id: LocationId) -> Result<LocationRecord, FetchError>;
}

/// HTTP implementation backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::Transport {
                url: settings.base_url.clone(),
                message: err.to_string(),
            })?;
        Ok(Self { settings, client })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        engine_trace!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| transport_error(&url, &err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|err| {
            if err.is_decode() {
                FetchError::Validation {
                    url,
                    message: err.to_string(),
                }
            } else {
                transport_error(&url, &err)
            }
        })
    }
}

#[async_trait::async_trait]
impl ShowApi for ReqwestApi {
    async fn list_episodes(&self, page: u32) -> Result<Page, FetchError> {
        self.get_json(format!("{}/episode?page={page}", self.settings.base_url))
            .await
    }

    async fn episode(&self, id: EpisodeId) -> Result<EpisodeRecord, FetchError> {
        self.get_json(format!("{}/episode/{id}", self.settings.base_url))
            .await
    }

    async fn character(&self, id: CharacterId) -> Result<CharacterRecord, FetchError> {
        self.get_json(format!("{}/character/{id}", self.settings.base_url))
            .await
    }

    async fn location(&self, id: LocationId) -> Result<LocationRecord, FetchError> {
        self.get_json(format!("{}/location/{id}", self.settings.base_url))
            .await
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> FetchError {
    let message = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    FetchError::Transport {
        url: url.to_string(),
        message,
    }
}
