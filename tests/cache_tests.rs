/// Cache tests.
///
/// The in-process tier is synchronous and deadline-based, so expiry can be
/// tested with short sleeps. The two-tier composition is exercised against an
/// in-memory durable tier, so the read-through, negative-marker and
/// write-through paths run without a database.

#[cfg(test)]
mod memory_tier_tests {
    use std::time::Duration;

    use fid_marketplace_backend::cache::MemoryTier;

    #[test]
    fn set_then_get() {
        let tier = MemoryTier::new();
        tier.set("listing:42", "{\"fid\":42}".to_string(), None);
        assert_eq!(tier.get("listing:42").as_deref(), Some("{\"fid\":42}"));
    }

    #[test]
    fn missing_key_is_none() {
        let tier = MemoryTier::new();
        assert!(tier.get("listing:404").is_none());
    }

    #[test]
    fn remove_clears_the_entry() {
        let tier = MemoryTier::new();
        tier.set("bestOffer:7", "x".to_string(), None);
        tier.remove("bestOffer:7");
        assert!(tier.get("bestOffer:7").is_none());
    }

    #[test]
    fn overwrite_replaces_value() {
        let tier = MemoryTier::new();
        tier.set("k", "old".to_string(), None);
        tier.set("k", "new".to_string(), None);
        assert_eq!(tier.get("k").as_deref(), Some("new"));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let tier = MemoryTier::new();
        tier.set("ethToUsd", "2000".to_string(), Some(Duration::from_millis(20)));
        assert!(tier.get("ethToUsd").is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert!(tier.get("ethToUsd").is_none());
    }

    #[test]
    fn entry_without_ttl_does_not_expire() {
        let tier = MemoryTier::new();
        tier.set("marketplace:stats:floor", "1".to_string(), None);
        std::thread::sleep(Duration::from_millis(30));
        assert!(tier.get("marketplace:stats:floor").is_some());
    }

    #[test]
    fn null_marker_convention() {
        // Negative markers are plain entries under the `<key>_null` name;
        // the look-aside layer checks them before either tier.
        let tier = MemoryTier::new();
        tier.set("listing:9_null", "1".to_string(), Some(Duration::from_secs(600)));
        assert!(tier.get("listing:9_null").is_some());
        tier.remove("listing:9_null");
        assert!(tier.get("listing:9_null").is_none());
    }
}

#[cfg(test)]
mod look_aside_tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use fid_marketplace_backend::cache::{DurableTier, LookAsideCache};
    use fid_marketplace_backend::db::cache::CacheRow;

    /// Durable tier over a plain map, standing in for `key_value_cache`.
    #[derive(Clone, Default)]
    struct MapTier {
        entries: Arc<Mutex<HashMap<String, (serde_json::Value, Option<DateTime<Utc>>)>>>,
    }

    impl MapTier {
        fn seed(&self, key: &str, value: serde_json::Value, expires_at: Option<DateTime<Utc>>) {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value, expires_at));
        }

        fn wipe(&self) {
            self.entries.lock().unwrap().clear();
        }

        fn contains(&self, key: &str) -> bool {
            self.entries.lock().unwrap().contains_key(key)
        }
    }

    impl DurableTier for MapTier {
        async fn find(&self, key: &str) -> Result<Option<CacheRow>, sqlx::Error> {
            let row = self.entries.lock().unwrap().get(key).map(|(value, expires_at)| CacheRow {
                key: key.to_string(),
                value: value.clone(),
                expires_at: *expires_at,
            });
            Ok(row)
        }

        async fn upsert(
            &self,
            key: &str,
            value: &serde_json::Value,
            expires_at: Option<DateTime<Utc>>,
        ) -> Result<(), sqlx::Error> {
            self.seed(key, value.clone(), expires_at);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), sqlx::Error> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn negative_then_positive() {
        let cache = LookAsideCache::with_tier(MapTier::default());
        // First read misses both tiers and plants the negative marker.
        assert_eq!(cache.get::<u64>("ethToUsd").await, None);
        // A set clears the marker; the value is visible immediately.
        cache.set("ethToUsd", &2000u64, None).await;
        assert_eq!(cache.get::<u64>("ethToUsd").await, Some(2000));
    }

    #[tokio::test]
    async fn negative_marker_suppresses_durable_lookups() {
        let tier = MapTier::default();
        let cache = LookAsideCache::with_tier(tier.clone());
        assert_eq!(cache.get::<u64>("listing:9").await, None);
        // A value written behind the cache's back stays invisible while the
        // marker is live.
        tier.seed("listing:9", serde_json::json!(1), None);
        assert_eq!(cache.get::<u64>("listing:9").await, None);
    }

    #[tokio::test]
    async fn durable_hit_repopulates_the_memory_tier() {
        let tier = MapTier::default();
        let cache = LookAsideCache::with_tier(tier.clone());
        tier.seed("marketplace:stats:floor", serde_json::json!("42"), None);
        assert_eq!(
            cache.get::<String>("marketplace:stats:floor").await.as_deref(),
            Some("42")
        );
        // Wiping the durable tier proves the second read is memory-served.
        tier.wipe();
        assert_eq!(
            cache.get::<String>("marketplace:stats:floor").await.as_deref(),
            Some("42")
        );
    }

    #[tokio::test]
    async fn expired_durable_entry_is_a_miss() {
        let tier = MapTier::default();
        let cache = LookAsideCache::with_tier(tier.clone());
        tier.seed(
            "bestOffer:3",
            serde_json::json!(5),
            Some(Utc::now() - chrono::Duration::seconds(1)),
        );
        assert_eq!(cache.get::<u64>("bestOffer:3").await, None);
    }

    #[tokio::test]
    async fn set_writes_through_to_the_durable_tier() {
        let tier = MapTier::default();
        let cache = LookAsideCache::with_tier(tier.clone());
        cache
            .set("marketplace:getStats", &7u64, Some(Duration::from_secs(60)))
            .await;
        assert!(tier.contains("marketplace:getStats"));
    }

    #[tokio::test]
    async fn delete_clears_both_tiers() {
        let tier = MapTier::default();
        let cache = LookAsideCache::with_tier(tier.clone());
        cache.set("listing:1", &1u64, None).await;
        cache.delete("listing:1").await;
        assert!(!tier.contains("listing:1"));
        assert_eq!(cache.get::<u64>("listing:1").await, None);
    }
}
