//! Whereabouts engine: remote API client, bounded task pool, and aggregation.
mod aggregate;
mod api;
mod persist;
mod pool;
mod types;

pub use aggregate::Aggregator;
pub use api::{
    ApiSettings, CharacterRecord, EpisodeRecord, LocationRecord, ObjectRef, Page, PageInfo,
    ReqwestApi, ResourceUrl, ShowApi,
};
pub use persist::{AtomicFileWriter, PersistError};
pub use pool::{run_pool, BoundedPool, Capacity};
pub use types::{AggregateError, FetchError};
