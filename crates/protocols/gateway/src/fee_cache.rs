//! Fee lookup cache
//!
//! Memoizes fee lookups per `(currency, tx type, network)` so the external SDK
//! is asked once per key:
//!
//! - a fresh entry is returned directly
//! - a key with a fetch outstanding joins that fetch instead of starting another
//! - fetches run on their own task, so a view that goes away mid-fetch does not
//!   cancel the entry other views are waiting for
//! - a failed fetch leaves the entry empty; the next access tries again
//!
//! [`DebouncedFees`] sits in front of the cache for one view and only lets a
//! key through once its inputs have been quiet for the debounce window.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bridge_core::{FeeCacheConfig, FeeFetchError, Network, TxType};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::fee::{normalize_fee_table, RawFeeTable, SimpleFee};
use crate::registry::Currency;

/// Cache key; currency is matched as an exact string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeeKey {
    pub currency: String,
    pub tx_type: TxType,
    pub network: Network,
}

impl FeeKey {
    pub fn new(currency: impl Into<String>, tx_type: TxType, network: Network) -> Self {
        Self {
            currency: currency.into(),
            tx_type,
            network,
        }
    }
}

impl fmt::Display for FeeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.currency, self.tx_type, self.network)
    }
}

/// The external SDK's fee lookup
pub trait FeeSource: Send + Sync + 'static {
    fn fetch_fees(&self, key: &FeeKey) -> BoxFuture<'static, Result<SimpleFee, FeeFetchError>>;
}

impl<F, Fut> FeeSource for F
where
    F: Fn(FeeKey) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SimpleFee, FeeFetchError>> + Send + 'static,
{
    fn fetch_fees(&self, key: &FeeKey) -> BoxFuture<'static, Result<SimpleFee, FeeFetchError>> {
        self(key.clone()).boxed()
    }
}

/// Pick the key's currency out of a raw SDK fee table
pub fn fee_from_table(table: &RawFeeTable, key: &FeeKey) -> Result<SimpleFee, FeeFetchError> {
    Ok(normalize_fee_table(table, Currency::from_symbol(&key.currency))?)
}

type SharedFetch = Shared<BoxFuture<'static, Result<SimpleFee, FeeFetchError>>>;

struct CachedFee {
    fee: SimpleFee,
    fetched_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<FeeKey, CachedFee>,
    in_flight: HashMap<FeeKey, SharedFetch>,
}

/// Shared fee cache; clones share the same entries
#[derive(Clone)]
pub struct FeeCache {
    source: Arc<dyn FeeSource>,
    inner: Arc<Mutex<CacheInner>>,
    ttl: Duration,
}

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeCacheStats {
    pub entries: usize,
    pub in_flight: usize,
}

impl FeeCache {
    pub fn new(source: Arc<dyn FeeSource>, config: &FeeCacheConfig) -> Self {
        Self {
            source,
            inner: Arc::new(Mutex::new(CacheInner::default())),
            ttl: config.ttl(),
        }
    }

    /// Fresh cached fee for `key`, without fetching
    pub async fn get(&self, key: &FeeKey) -> Option<SimpleFee> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.fee)
    }

    /// Cached fee for `key`, fetching it (at most once at a time) on a miss
    pub async fn get_or_fetch(&self, key: &FeeKey) -> Result<SimpleFee, FeeFetchError> {
        let fetch = {
            let mut inner = self.inner.lock().await;

            if let Some(entry) = inner.entries.get(key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    trace!(key = %key, "Fee cache HIT");
                    return Ok(entry.fee);
                }
            }

            match inner.in_flight.get(key) {
                Some(fetch) => {
                    debug!(key = %key, "Joining in-flight fee fetch");
                    fetch.clone()
                }
                None => {
                    debug!(key = %key, "Fee cache MISS, fetching");
                    let fetch = self.spawn_fetch(key.clone());
                    inner.in_flight.insert(key.clone(), fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    fn spawn_fetch(&self, key: FeeKey) -> SharedFetch {
        let source = self.source.clone();
        let inner = self.inner.clone();

        let task = {
            let inner = inner.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let result = source.fetch_fees(&key).await;

                let mut guard = inner.lock().await;
                guard.in_flight.remove(&key);
                match &result {
                    Ok(fee) => {
                        guard.entries.insert(
                            key.clone(),
                            CachedFee {
                                fee: *fee,
                                fetched_at: Instant::now(),
                            },
                        );
                    }
                    Err(e) => {
                        guard.entries.remove(&key);
                        warn!(key = %key, code = e.error_code(), "Fee fetch failed: {}", e);
                    }
                }
                result
            })
        };

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    inner.lock().await.in_flight.remove(&key);
                    warn!(key = %key, "Fee fetch task did not complete: {}", e);
                    Err(FeeFetchError::Aborted {
                        reason: e.to_string(),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Drop the entry for `key` so the next access refetches
    pub async fn invalidate(&self, key: &FeeKey) {
        self.inner.lock().await.entries.remove(key);
    }

    pub async fn stats(&self) -> FeeCacheStats {
        let inner = self.inner.lock().await;
        FeeCacheStats {
            entries: inner.entries.len(),
            in_flight: inner.in_flight.len(),
        }
    }
}

/// Outcome of a debounced fee lookup
#[derive(Debug, Clone, PartialEq)]
pub enum FeeLookup {
    Ready(SimpleFee),
    /// A newer request arrived within the debounce window
    Superseded,
    /// The view was torn down; any fetched value stays in the shared cache
    Closed,
    /// The source failed; retrying is up to the caller
    Failed(FeeFetchError),
}

/// Per-view debouncer in front of a shared [`FeeCache`]
pub struct DebouncedFees {
    cache: FeeCache,
    window: Duration,
    generation: AtomicU64,
    closed: AtomicBool,
    teardown: Notify,
}

impl DebouncedFees {
    pub fn new(cache: FeeCache, config: &FeeCacheConfig) -> Self {
        Self {
            cache,
            window: config.debounce(),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            teardown: Notify::new(),
        }
    }

    /// Request fees for `key` after the inputs have settled.
    ///
    /// Call on every input change; only the last call within the window
    /// reaches the cache.
    pub async fn settle(&self, key: FeeKey) -> FeeLookup {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Registered before the flag check so a concurrent close() is not missed
        let closed = self.teardown.notified();
        tokio::pin!(closed);
        if self.is_closed() {
            return FeeLookup::Closed;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.window) => {}
            _ = &mut closed => return FeeLookup::Closed,
        }

        if self.generation.load(Ordering::SeqCst) != ticket {
            trace!(key = %key, "Fee request superseded");
            return FeeLookup::Superseded;
        }

        // Dropping the lookup on close is fine: the fetch runs on its own task
        let result = tokio::select! {
            result = self.cache.get_or_fetch(&key) => result,
            _ = &mut closed => return FeeLookup::Closed,
        };
        if self.is_closed() {
            return FeeLookup::Closed;
        }

        match result {
            Ok(fee) => FeeLookup::Ready(fee),
            Err(e) => FeeLookup::Failed(e),
        }
    }

    /// Tear down the view: pending and future `settle` calls resolve `Closed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.teardown.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> &FeeCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const FETCH_DELAY: Duration = Duration::from_millis(100);

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn btc_fee() -> SimpleFee {
        SimpleFee {
            mint: 20,
            burn: 10,
            lock: 100_000,
            release: 100_000,
        }
    }

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        keys: std::sync::Mutex<Vec<FeeKey>>,
        fail: AtomicBool,
    }

    impl CountingSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FeeSource for CountingSource {
        fn fetch_fees(&self, key: &FeeKey) -> BoxFuture<'static, Result<SimpleFee, FeeFetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keys.lock().unwrap().push(key.clone());
            let fail = self.fail.load(Ordering::SeqCst);
            async move {
                tokio::time::sleep(FETCH_DELAY).await;
                if fail {
                    Err(FeeFetchError::Source {
                        message: "gateway unreachable".into(),
                    })
                } else {
                    Ok(btc_fee())
                }
            }
            .boxed()
        }
    }

    fn key(currency: &str) -> FeeKey {
        FeeKey::new(currency, TxType::Mint, Network::Testnet)
    }

    fn setup() -> (Arc<CountingSource>, FeeCache) {
        init_tracing();
        let source = Arc::new(CountingSource::default());
        let cache = FeeCache::new(source.clone(), &FeeCacheConfig::default());
        (source, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let (source, cache) = setup();
        let k = key("BTC");

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch(&k),
            cache.get_or_fetch(&k),
            cache.get_or_fetch(&k)
        );
        assert_eq!(a.unwrap(), btc_fee());
        assert_eq!(b.unwrap(), btc_fee());
        assert_eq!(c.unwrap(), btc_fee());
        assert_eq!(source.calls(), 1);

        // Served from cache afterwards
        assert_eq!(cache.get_or_fetch(&k).await.unwrap(), btc_fee());
        assert_eq!(source.calls(), 1);
        assert_eq!(
            cache.stats().await,
            FeeCacheStats {
                entries: 1,
                in_flight: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_exact() {
        let (source, cache) = setup();
        cache.get_or_fetch(&key("BTC")).await.unwrap();
        cache.get_or_fetch(&key("btc")).await.unwrap();
        cache
            .get_or_fetch(&FeeKey::new("BTC", TxType::Burn, Network::Testnet))
            .await
            .unwrap();
        cache
            .get_or_fetch(&FeeKey::new("BTC", TxType::Mint, Network::Mainnet))
            .await
            .unwrap();
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_refetch() {
        let (source, cache) = setup();
        let k = key("BTC");

        cache.get_or_fetch(&k).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(cache.get(&k).await, None);

        cache.get_or_fetch(&k).await.unwrap();
        assert_eq!(source.calls(), 2);

        cache.invalidate(&k).await;
        cache.get_or_fetch(&k).await.unwrap();
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_leaves_entry_empty() {
        let (source, cache) = setup();
        let k = key("BTC");
        source.fail.store(true, Ordering::SeqCst);

        let err = cache.get_or_fetch(&k).await.unwrap_err();
        assert_eq!(err.error_code(), "fee_source_failed");
        assert_eq!(cache.get(&k).await, None);
        assert_eq!(cache.stats().await.in_flight, 0);

        // Not poisoned: the next access fetches again
        source.fail.store(false, Ordering::SeqCst);
        assert_eq!(cache.get_or_fetch(&k).await.unwrap(), btc_fee());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_only_fetches_settled_key() {
        let (source, cache) = setup();
        let fees = DebouncedFees::new(cache, &FeeCacheConfig::default());

        let (first, second, third) = tokio::join!(
            fees.settle(key("BTC")),
            async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                fees.settle(key("ZEC")).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(600)).await;
                fees.settle(key("DOGE")).await
            }
        );

        assert_eq!(first, FeeLookup::Superseded);
        assert_eq!(second, FeeLookup::Superseded);
        assert_eq!(third, FeeLookup::Ready(btc_fee()));
        assert_eq!(source.calls(), 1);
        assert_eq!(*source.keys.lock().unwrap(), vec![key("DOGE")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_discards_result_but_keeps_cache() {
        let (source, cache) = setup();
        let fees = Arc::new(DebouncedFees::new(cache.clone(), &FeeCacheConfig::default()));

        let pending = {
            let fees = fees.clone();
            tokio::spawn(async move { fees.settle(key("BTC")).await })
        };

        // Past the debounce window, fetch still outstanding
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        fees.close();

        assert_eq!(pending.await.unwrap(), FeeLookup::Closed);
        tokio::time::sleep(FETCH_DELAY).await;
        assert_eq!(cache.get(&key("BTC")).await, Some(btc_fee()));
        assert_eq!(source.calls(), 1);

        assert_eq!(fees.settle(key("BTC")).await, FeeLookup::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_wakes_settle_inside_window() {
        let (source, cache) = setup();
        let fees = Arc::new(DebouncedFees::new(cache, &FeeCacheConfig::default()));
        let started = Instant::now();

        let pending = {
            let fees = fees.clone();
            tokio::spawn(async move { fees.settle(key("BTC")).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        fees.close();

        assert_eq!(pending.await.unwrap(), FeeLookup::Closed);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_source_with_raw_table() {
        init_tracing();
        let table: RawFeeTable = serde_json::from_str(
            r#"{"BTC": {"mint": 20, "burn": 10, "lock": "100000", "release": "100000"}}"#,
        )
        .unwrap();
        let table = Arc::new(table);

        let source = move |k: FeeKey| {
            let table = table.clone();
            async move { fee_from_table(&table, &k) }
        };
        let cache = FeeCache::new(Arc::new(source), &FeeCacheConfig::default());

        assert_eq!(cache.get_or_fetch(&key("BTC")).await.unwrap(), btc_fee());
        let err = cache.get_or_fetch(&key("DOGE")).await.unwrap_err();
        assert_eq!(err.error_code(), "fee_data_invalid");
    }
}
