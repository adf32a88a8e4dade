use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};

/// Upper bound on simultaneously in-flight work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Limit(NonZeroUsize),
    Unbounded,
}

impl Capacity {
    /// Bounded capacity. Returns `None` when `limit` is zero; a pool that
    /// admits nothing can never make progress.
    pub fn limit(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(Self::Limit)
    }

    fn admits(self, in_flight: usize) -> bool {
        match self {
            Self::Limit(limit) => in_flight < limit.get(),
            Self::Unbounded => true,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit(limit) => write!(f, "{limit}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Runs submitted futures with at most `capacity` of them in flight,
/// yielding completions as they finish.
///
/// Completion order is unrelated to submission order; callers impose any
/// final ordering themselves. A slot is freed before new work is admitted,
/// so the in-flight set never exceeds the cap, not even transiently.
pub struct BoundedPool<'a, T> {
    capacity: Capacity,
    in_flight: FuturesUnordered<BoxFuture<'a, T>>,
}

impl<'a, T> BoundedPool<'a, T> {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            capacity,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Number of submitted items that have not completed yet.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Admits `work` into the pool, first waiting for a slot if the pool is
    /// at capacity. Any completions collected while waiting are returned, in
    /// completion order.
    ///
    /// Every submitted future runs to completion; the pool never drops or
    /// cancels work, and a failing item (for `T = Result<..>`) surfaces when
    /// its slot is collected without disturbing its siblings.
    pub async fn submit(&mut self, work: impl Future<Output = T> + Send + 'a) -> Vec<T> {
        let mut done = Vec::new();
        while !self.capacity.admits(self.in_flight.len()) {
            if let Some(finished) = self.in_flight.next().await {
                done.push(finished);
            }
        }
        self.in_flight.push(Box::pin(work));
        done
    }

    /// Runs the remaining in-flight set to exhaustion and returns those
    /// completions.
    pub async fn drain(&mut self) -> Vec<T> {
        let mut done = Vec::new();
        while let Some(finished) = self.in_flight.next().await {
            done.push(finished);
        }
        done
    }
}

/// Convenience for a fixed backlog: submit everything, then drain.
pub async fn run_pool<'a, T, F, I>(work: I, capacity: Capacity) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T> + Send + 'a,
{
    let mut pool = BoundedPool::new(capacity);
    let mut done = Vec::new();
    for item in work {
        done.extend(pool.submit(item).await);
    }
    done.extend(pool.drain().await);
    done
}
