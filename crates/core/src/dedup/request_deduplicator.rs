//! Collapses concurrent identical fetches.
//!
//! The first caller for a key starts the producer; callers arriving while it
//! is still in flight (and younger than its ttl) await the same shared
//! future and receive the same value or the same error. The entry is evicted
//! as soon as the producer settles. Entries whose producer never settles are
//! dropped by `sweep_expired`, which `spawn_sweeper` runs periodically.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::constants::DEFAULT_DEDUP_TTL_MS;
use crate::errors::Result;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

type SharedRequest<T> = Shared<BoxFuture<'static, Result<T>>>;

struct PendingRequest<T> {
    generation: u64,
    started_at: Instant,
    ttl: Duration,
    request: SharedRequest<T>,
}

impl<T> PendingRequest<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.started_at) > self.ttl
    }
}

type PendingMap<T> = Arc<Mutex<HashMap<String, PendingRequest<T>>>>;

pub struct RequestDeduplicator<T> {
    pending: PendingMap<T>,
    next_generation: AtomicU64,
    default_ttl: Duration,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Runs `producer` for `key` unless an identical request is already in flight.
    pub async fn execute<F, Fut>(&self, key: &str, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.execute_with_ttl(key, self.default_ttl, producer).await
    }

    pub async fn execute_with_ttl<F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let request = {
            let mut pending = self.pending.lock().unwrap();
            let now = Instant::now();
            match pending.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    debug!("Joining in-flight request '{}'", key);
                    entry.request.clone()
                }
                _ => {
                    let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
                    let request = Self::evicting(
                        Arc::downgrade(&self.pending),
                        key.to_string(),
                        generation,
                        producer(),
                    );
                    pending.insert(
                        key.to_string(),
                        PendingRequest {
                            generation,
                            started_at: now,
                            ttl,
                            request: request.clone(),
                        },
                    );
                    request
                }
            }
        };
        request.await
    }

    /// Wraps a producer future so it removes its own entry once settled.
    /// The generation check keeps a newer request under the same key alive.
    fn evicting<Fut>(
        registry: Weak<Mutex<HashMap<String, PendingRequest<T>>>>,
        key: String,
        generation: u64,
        produced: Fut,
    ) -> SharedRequest<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        async move {
            let result = produced.await;
            if let Some(registry) = registry.upgrade() {
                let mut pending = registry.lock().unwrap();
                if pending.get(&key).map(|e| e.generation) == Some(generation) {
                    pending.remove(&key);
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Drops entries older than their ttl, settled or not. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut pending = self.pending.lock().unwrap();
        let before = pending.len();
        pending.retain(|_, entry| !entry.is_expired(now));
        let removed = before - pending.len();
        if removed > 0 {
            debug!("Swept {} expired request(s)", removed);
        }
        removed
    }

    /// Runs `sweep_expired` every `interval` until the deduplicator is dropped.
    /// A zero interval is raised to one millisecond.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(dedup) => {
                        dedup.sweep_expired();
                    }
                    None => break,
                }
            }
        })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEDUP_TTL_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DatabaseError, Error};
    use std::sync::atomic::AtomicUsize;

    fn counting_producer(
        calls: Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32>> {
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_invoke_producer_once() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            dedup.execute("field:2025-07:A,B", counting_producer(calls.clone(), 1)),
            dedup.execute("field:2025-07:A,B", counting_producer(calls.clone(), 2)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_keys_run_independently() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            dedup.execute("a", counting_producer(calls.clone(), 1)),
            dedup.execute("b", counting_producer(calls.clone(), 2)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_entry_is_evicted() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::default();
        let calls = Arc::new(AtomicUsize::new(0));

        dedup
            .execute("k", counting_producer(calls.clone(), 1))
            .await
            .unwrap();
        let second = dedup
            .execute("k", counting_producer(calls.clone(), 2))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callers_share_the_same_error() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err::<u32, Error>(DatabaseError::QueryFailed("offline".to_string()).into())
            }
        };

        let (a, b) = tokio::join!(
            dedup.execute("k", failing(calls.clone())),
            dedup.execute("k", failing(calls.clone())),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let (a, b) = (a.unwrap_err(), b.unwrap_err());
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_stuck_entries_after_ttl() {
        let dedup: Arc<RequestDeduplicator<u32>> =
            Arc::new(RequestDeduplicator::new(Duration::from_millis(100)));
        let calls = Arc::new(AtomicUsize::new(0));

        let stuck = {
            let dedup = dedup.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                dedup
                    .execute("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        futures::future::pending::<Result<u32>>().await
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(dedup.pending_count(), 1);
        assert_eq!(dedup.sweep_expired(), 0);

        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(dedup.sweep_expired(), 1);
        assert_eq!(dedup.pending_count(), 0);

        let value = dedup
            .execute("k", counting_producer(calls.clone(), 7))
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        stuck.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_not_joined() {
        let dedup: Arc<RequestDeduplicator<u32>> =
            Arc::new(RequestDeduplicator::new(Duration::from_millis(100)));
        let calls = Arc::new(AtomicUsize::new(0));

        let stuck = {
            let dedup = dedup.clone();
            tokio::spawn(async move {
                dedup
                    .execute("k", || futures::future::pending::<Result<u32>>())
                    .await
            })
        };
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(150)).await;

        let value = dedup
            .execute("k", counting_producer(calls.clone(), 3))
            .await
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        stuck.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_when_dropped() {
        let dedup: Arc<RequestDeduplicator<u32>> = Arc::new(RequestDeduplicator::default());
        let handle = dedup.spawn_sweeper(Duration::from_millis(10));
        drop(dedup);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_sweeper_keeps_sweeping() {
        let dedup: Arc<RequestDeduplicator<u32>> =
            Arc::new(RequestDeduplicator::new(Duration::from_millis(100)));
        let handle = dedup.spawn_sweeper(Duration::ZERO);

        let stuck = {
            let dedup = dedup.clone();
            tokio::spawn(async move {
                dedup
                    .execute("k", || futures::future::pending::<Result<u32>>())
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(dedup.pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(dedup.pending_count(), 0);
        assert!(!handle.is_finished());

        stuck.abort();
        handle.abort();
    }
}
