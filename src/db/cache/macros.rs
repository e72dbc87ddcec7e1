/// A macro to simplify read-through caching.
///
/// This macro checks if a value is present in the cache.
/// If found, it returns the cached value.
/// If not found, it awaits the provided future to compute the value,
/// stores it in the cache under the given TTL class, and then returns it.
/// Errors from the future are propagated with `?` and never cached.
///
/// # Arguments
/// * `$cache`: The [`Cache`](crate::db::Cache) instance to read and write.
/// * `$key`: A [`CacheKey`](crate::db::CacheKey) (anything implementing `Display`).
/// * `$ttl`: The [`CacheTtl`](crate::db::CacheTtl) class for the stored value.
/// * `$block`: The future to await if the value is not found in cache.
///
/// # Example
/// ```rust,ignore
/// cached!(cache, CacheKey::Venue(id.clone()), CacheTtl::Medium, async move {
///     store.get_venue(&id).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key.to_string();
        if let Some(cached) = $cache.get(&key) {
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            tracing::debug!(key = %key, "Cache miss");
            let value = $block.await?;
            $cache.set(&key, &value, $cache.presets().duration($ttl));
            Ok(value)
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::db::{Cache, CacheKey, CacheTtl, TtlPresets};
    use crate::error::{AppError, AppResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn lookup(cache: &Cache, calls: &AtomicUsize, fail: bool) -> AppResult<String> {
        cached!(
            cache,
            CacheKey::Venue("venue-1".to_string()),
            CacheTtl::Medium,
            async {
                calls.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(AppError::NotFound("Venue not found".to_string()))
                } else {
                    Ok("Blue Note Jazz Club".to_string())
                }
            }
        )
    }

    #[test]
    fn test_cached_computes_once() {
        let cache = Cache::new(TtlPresets::default());
        let calls = AtomicUsize::new(0);

        let first = tokio_test::block_on(lookup(&cache, &calls, false)).unwrap();
        let second = tokio_test::block_on(lookup(&cache, &calls, false)).unwrap();

        assert_eq!(first, "Blue Note Jazz Club");
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cached_does_not_store_errors() {
        let cache = Cache::new(TtlPresets::default());
        let calls = AtomicUsize::new(0);

        assert!(tokio_test::block_on(lookup(&cache, &calls, true)).is_err());
        assert!(cache.is_empty());

        let value = tokio_test::block_on(lookup(&cache, &calls, false)).unwrap();
        assert_eq!(value, "Blue Note Jazz Club");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
