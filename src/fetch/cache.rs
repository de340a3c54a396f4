//! On-disk memoization of chunk fetches.
//!
//! Every entry lives at `<root>/<namespace>/<function>/<args>.json` and holds the JSON
//! payload one call produced. Entries never expire: historical sessions are immutable
//! once published. The exception is a chunk ending on a trading day that is still in
//! progress, which stays cached as a partial day until the directory is cleared by hand.

use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Context, Result};
use crate::utils::escape_key_segment;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Canonical, order-sensitive rendering of a call's arguments.
pub trait CacheArgs {
    fn cache_key_parts(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    function: String,
    args: String,
}

impl CacheKey {
    pub fn new<A: CacheArgs + ?Sized>(namespace: &str, function: &str, args: &A) -> Self {
        let args = args
            .cache_key_parts()
            .iter()
            .map(|part| escape_key_segment(part))
            .collect::<Vec<_>>()
            .join("_");

        Self {
            namespace: escape_key_segment(namespace),
            function: escape_key_segment(function),
            args,
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.namespace)
            .join(&self.function)
            .join(format!("{}.json", self.args))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.function, self.args)
    }
}

/// File-backed result store scoped to one namespace.
#[derive(Debug, Clone)]
pub struct ResultCache {
    root: PathBuf,
    namespace: String,
}

impl ResultCache {
    pub fn new(root: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            namespace: namespace.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key<A: CacheArgs + ?Sized>(&self, function: &str, args: &A) -> CacheKey {
        CacheKey::new(&self.namespace, function, args)
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Load a stored entry. Missing files are a miss; unreadable ones are logged and
    /// treated as a miss so the next successful fetch replaces them.
    pub async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let path = self.entry_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Failed to read cache entry {}: {err}", path.display());
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring corrupt cache entry {}: {err}", path.display());
                None
            }
        }
    }

    /// Persist `value` under `key`. The payload lands in a temporary sibling first and is
    /// renamed into place, so a reader sees either nothing or a complete entry.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) -> Result<()> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create cache directory {}", parent.display()))?;
        }

        let payload = serde_json::to_vec(value)?;
        let temp = path.with_extension(format!(
            "json.{}-{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(err) = tokio::fs::write(&temp, &payload).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err.into());
        }
        if let Err(err) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err.into());
        }

        Ok(())
    }

    /// Return the cached value for `(function, args)` or run `fetch` and store its result.
    /// A failed fetch leaves the cache untouched.
    pub async fn get_or_fetch<A, T, F, Fut>(&self, function: &str, args: A, fetch: F) -> Result<T>
    where
        A: CacheArgs,
        T: Serialize + DeserializeOwned,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = self.key(function, &args);
        if let Some(hit) = self.read(&key).await {
            debug!("cache hit {key}");
            return Ok(hit);
        }

        debug!("cache miss {key}");
        let value = fetch(args).await?;
        self.write(&key, &value).await?;
        Ok(value)
    }

    /// Bind `fetch` to this cache under `function`, yielding a memoizing wrapper.
    pub fn wrap<F>(&self, function: &'static str, fetch: F) -> Cached<F> {
        Cached {
            cache: self.clone(),
            function,
            fetch,
        }
    }
}

/// A fetch function whose calls go through a [`ResultCache`].
pub struct Cached<F> {
    cache: ResultCache,
    function: &'static str,
    fetch: F,
}

impl<F> Cached<F> {
    pub async fn call<A, T, Fut>(&self, args: A) -> Result<T>
    where
        A: CacheArgs,
        T: Serialize + DeserializeOwned,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cache
            .get_or_fetch(self.function, args, &self.fetch)
            .await
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use crate::fetch::ChunkPool;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone)]
    struct Args(&'static str, u32);

    impl CacheArgs for Args {
        fn cache_key_parts(&self) -> Vec<String> {
            vec![self.0.to_string(), self.1.to_string()]
        }
    }

    fn counting_fetch(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn(Args) -> std::future::Ready<Result<Vec<String>>> {
        move |args: Args| {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(vec![format!("{}:{}", args.0, args.1)]))
        }
    }

    #[tokio::test]
    async fn identical_calls_fetch_once() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = ResultCache::new(dir.path(), "test-ns").wrap("echo", counting_fetch(calls.clone()));

        let first: Vec<String> = cached.call(Args("SBIN", 1)).await.unwrap();
        let second: Vec<String> = cached.call(Args("SBIN", 1)).await.unwrap();

        assert_eq!(first, vec!["SBIN:1".to_string()]);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_arguments_fetch_separately() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = ResultCache::new(dir.path(), "test-ns").wrap("echo", counting_fetch(calls.clone()));

        for args in [Args("SBIN", 1), Args("SBIN", 2), Args("INFY", 1), Args("SBIN", 1)] {
            let _: Vec<String> = cached.call(args).await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn entries_survive_new_cache_instances() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = ResultCache::new(dir.path(), "test-ns").wrap("echo", counting_fetch(calls.clone()));
        let _: Vec<String> = first.call(Args("SBIN", 7)).await.unwrap();

        let second = ResultCache::new(dir.path(), "test-ns").wrap("echo", counting_fetch(calls.clone()));
        let value: Vec<String> = second.call(Args("SBIN", 7)).await.unwrap();

        assert_eq!(value, vec!["SBIN:7".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn namespaces_do_not_share_entries() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let stock = ResultCache::new(dir.path(), "stock").wrap("fetch", counting_fetch(calls.clone()));
        let derivs =
            ResultCache::new(dir.path(), "derivatives").wrap("fetch", counting_fetch(calls.clone()));

        let _: Vec<String> = stock.call(Args("NIFTY", 1)).await.unwrap();
        let _: Vec<String> = derivs.call(Args("NIFTY", 1)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_entry() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "test-ns");

        let err = cache
            .get_or_fetch("boom", Args("SBIN", 1), |_args| async {
                Err::<Vec<String>, _>(HistoryError::remote("status 503"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::RemoteFetch(_)));

        let key = cache.key("boom", &Args("SBIN", 1));
        assert!(!cache.entry_path(&key).exists());
        assert!(cache.read::<Vec<String>>(&key).await.is_none());

        let value = cache
            .get_or_fetch("boom", Args("SBIN", 1), |_args| async {
                Ok(vec!["recovered".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(value, vec!["recovered".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_entry_is_refetched() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(dir.path(), "test-ns");
        let key = cache.key("echo", &Args("SBIN", 1));
        let path = cache.entry_path(&key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        let value: Vec<String> = cache
            .get_or_fetch("echo", Args("SBIN", 1), |_args| async { Ok(vec!["fresh".to_string()]) })
            .await
            .unwrap();

        assert_eq!(value, vec!["fresh".to_string()]);
        assert_eq!(cache.read::<Vec<String>>(&key).await, Some(vec!["fresh".to_string()]));
    }

    #[tokio::test]
    async fn concurrent_writers_for_one_key_leave_a_complete_entry() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cached = ResultCache::new(dir.path(), "test-ns").wrap("slow", move |args: Args| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, HistoryError>(vec![format!("{}:{}", args.0, args.1)])
            }
        });

        let args = Args("SBIN", 9);
        let results: Vec<Vec<String>> = ChunkPool::new(2)
            .run(vec![args.clone(), args.clone()], |args| cached.call(args))
            .await
            .unwrap();

        assert_eq!(results[0], vec!["SBIN:9".to_string()]);
        assert_eq!(results[0], results[1]);
        assert!(calls.load(Ordering::SeqCst) >= 1);

        let cache = cached.cache();
        let key = cache.key("slow", &args);
        assert_eq!(
            cache.read::<Vec<String>>(&key).await,
            Some(vec!["SBIN:9".to_string()])
        );

        let leftovers: Vec<_> = std::fs::read_dir(cache.entry_path(&key).parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "{leftovers:?}");
    }

    #[test]
    fn keys_are_deterministic_and_escaped() {
        let cache = ResultCache::new("/tmp/unused", "nsehistory-stock");
        let a = cache.key("stock", &Args("M&M", 1));
        let b = cache.key("stock", &Args("M&M", 1));

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "nsehistory-stock/stock/M%26M_1");
        assert_eq!(
            a.relative_path(),
            PathBuf::from("nsehistory-stock").join("stock").join("M%26M_1.json")
        );
        assert_ne!(a, cache.key("stock", &Args("M&M", 2)));
    }

    #[test]
    fn joined_parts_cannot_collide() {
        struct Parts(Vec<&'static str>);
        impl CacheArgs for Parts {
            fn cache_key_parts(&self) -> Vec<String> {
                self.0.iter().map(|part| part.to_string()).collect()
            }
        }

        let left = CacheKey::new("ns", "f", &Parts(vec!["a_b", "c"]));
        let right = CacheKey::new("ns", "f", &Parts(vec!["a", "b_c"]));
        assert_ne!(left, right);
    }
}
