//! Timeline Integration Tests
//!
//! End-to-end flows across the paginator, the tiered cache, a shared
//! durable store, and the quota manager.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};

use herdline::cache::TieredCache;
use herdline::model::{TimelineFilter, TimelineItem, TimelineKind};
use herdline::pagination::{PaginatorConfig, TimelinePaginator};
use herdline::quota::{
    DataCategory, FixedSpaceProbe, RecordVault, StorageQuotaConfig, StorageQuotaManager,
    StoredRecord,
};
use herdline::source::InMemoryRemoteSource;
use herdline::store::InMemoryKeyValueStore;

fn item(id: &str, minutes_ago: i64) -> TimelineItem {
    let mut item = TimelineItem::new(
        id,
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap() - ChronoDuration::minutes(minutes_ago),
        TimelineKind::Journal,
        format!("entry {id}"),
    );
    item.category = Some("feeding".to_string());
    item
}

fn items(count: usize) -> Vec<TimelineItem> {
    (0..count)
        .map(|i| item(&format!("item-{i:03}"), i as i64))
        .collect()
}

fn no_prefetch_config() -> PaginatorConfig {
    PaginatorConfig {
        enable_prefetch: false,
        ..PaginatorConfig::default()
    }
}

// =============================================================================
// Pagination + Cache Integration Tests
// =============================================================================

/// A user scrolls a feeding view to the bottom: two pages, exhaustion,
/// and no further remote traffic afterwards.
#[tokio::test]
async fn test_scroll_to_exhaustion() {
    let store = Arc::new(InMemoryKeyValueStore::new());
    let source = Arc::new(InMemoryRemoteSource::with_items(items(30)));
    let cache = Arc::new(TieredCache::open(store).await.unwrap());
    let paginator =
        TimelinePaginator::with_config(no_prefetch_config(), source.clone(), cache);

    let sig = paginator.initialize(TimelineFilter::for_category("feeding"));

    let first = paginator.load_initial_page(&sig).await.unwrap();
    assert_eq!(first.len(), 20);
    assert!(paginator.should_load_more(&sig, 16));

    let all = paginator.load_next_page(&sig).await.unwrap();
    assert_eq!(all.len(), 30);
    assert!(!paginator.has_more_data(&sig));
    assert!(!paginator.should_load_more(&sig, 29));
    assert_eq!(source.page_fetches(), 2);

    // Further load attempts are no-ops
    paginator.load_next_page(&sig).await.unwrap();
    assert_eq!(source.page_fetches(), 2);

    // Newest first throughout
    assert!(all.windows(2).all(|w| w[0].date >= w[1].date));
}

/// App restart: a fresh paginator over the same durable store serves
/// the first page from the persistent tier without touching the remote.
#[tokio::test]
async fn test_restart_serves_from_persistent_tier() {
    let store = Arc::new(InMemoryKeyValueStore::new());
    let source = Arc::new(InMemoryRemoteSource::with_items(items(30)));

    {
        let cache = Arc::new(TieredCache::open(store.clone()).await.unwrap());
        let paginator =
            TimelinePaginator::with_config(no_prefetch_config(), source.clone(), cache);
        let sig = paginator.initialize(TimelineFilter::for_category("feeding"));
        paginator.load_initial_page(&sig).await.unwrap();
    }
    assert_eq!(source.page_fetches(), 1);

    // New process: new cache and paginator, same durable store
    let cache = Arc::new(TieredCache::open(store).await.unwrap());
    let paginator = TimelinePaginator::with_config(no_prefetch_config(), source.clone(), cache);
    let sig = paginator.initialize(TimelineFilter::for_category("feeding"));
    let restored = paginator.load_initial_page(&sig).await.unwrap();

    assert_eq!(restored.len(), 20);
    assert_eq!(source.page_fetches(), 1);
}

/// Distinct filters never see each other's cached pages, and a refresh
/// of one view leaves the other's cache intact.
#[tokio::test]
async fn test_filter_views_stay_isolated() {
    let mut seeded = items(12);
    for entry in &mut seeded[0..6] {
        entry.animal_id = Some("goat-1".to_string());
    }
    for entry in &mut seeded[6..12] {
        entry.animal_id = Some("goat-2".to_string());
    }
    let store = Arc::new(InMemoryKeyValueStore::new());
    let source = Arc::new(InMemoryRemoteSource::with_items(seeded));
    let cache = Arc::new(TieredCache::open(store).await.unwrap());
    let paginator =
        TimelinePaginator::with_config(no_prefetch_config(), source.clone(), cache);

    let sig_1 = paginator.initialize(TimelineFilter::for_animal("goat-1"));
    let sig_2 = paginator.initialize(TimelineFilter::for_animal("goat-2"));
    paginator.load_initial_page(&sig_1).await.unwrap();
    paginator.load_initial_page(&sig_2).await.unwrap();
    assert_eq!(source.page_fetches(), 2);

    paginator.refresh(&sig_1).await.unwrap();
    assert_eq!(source.page_fetches(), 3);

    // goat-2's page is still cached
    paginator.load_initial_page(&sig_2).await.unwrap();
    assert_eq!(source.page_fetches(), 3);
}

// =============================================================================
// Cache + Quota Coexistence Tests
// =============================================================================

/// Cache pages and quota records share one durable store under
/// disjoint namespaces: cached pages never inflate quota usage, and a
/// view refresh never disturbs stored records.
#[tokio::test]
async fn test_shared_store_namespaces_disjoint() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryKeyValueStore::new());

    let source = Arc::new(InMemoryRemoteSource::with_items(items(30)));
    let cache = Arc::new(TieredCache::open(store.clone()).await.unwrap());
    let paginator =
        TimelinePaginator::with_config(no_prefetch_config(), source.clone(), cache);

    let vault = RecordVault::open(
        store.clone(),
        dir.path().join("photos"),
        dir.path().join("temp"),
        dir.path().join("archive"),
    )
    .await
    .unwrap();
    let manager = StorageQuotaManager::new(
        vault,
        Arc::new(FixedSpaceProbe::new(1 << 30)),
        StorageQuotaConfig::default(),
    )
    .unwrap();

    manager
        .vault()
        .put_record(&StoredRecord {
            id: "j1".to_string(),
            user_id: "user-1".to_string(),
            category: DataCategory::Journal,
            created_at: Utc::now(),
            synced: false,
            body: "fed the goats".to_string(),
        })
        .await
        .unwrap();
    let baseline = manager.storage_stats().await.unwrap();

    let sig = paginator.initialize(TimelineFilter::for_category("feeding"));
    paginator.load_initial_page(&sig).await.unwrap();

    // Cached timeline pages do not count against the quota
    let after_caching = manager.storage_stats().await.unwrap();
    assert_eq!(after_caching.total_used, baseline.total_used);

    // And refreshing the view leaves the record untouched
    paginator.refresh(&sig).await.unwrap();
    assert!(manager
        .vault()
        .get_record(DataCategory::Journal, "j1")
        .await
        .unwrap()
        .is_some());
}

/// Forced cleanup across a populated vault reclaims stale synced data
/// while unsynced and recent records survive end to end.
#[tokio::test]
async fn test_cleanup_preserves_protected_data() {
    let dir = tempfile::tempdir().unwrap();
    let vault = RecordVault::open(
        Arc::new(InMemoryKeyValueStore::new()),
        dir.path().join("photos"),
        dir.path().join("temp"),
        dir.path().join("archive"),
    )
    .await
    .unwrap();
    let manager = StorageQuotaManager::new(
        vault,
        Arc::new(FixedSpaceProbe::new(1 << 30)),
        StorageQuotaConfig::default(),
    )
    .unwrap();

    let record = |id: &str, days_old: i64, synced: bool| StoredRecord {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        category: DataCategory::Health,
        created_at: Utc::now() - ChronoDuration::days(days_old),
        synced,
        body: "vaccination notes ".repeat(30),
    };
    let vault = manager.vault();
    vault.put_record(&record("stale-synced", 90, true)).await.unwrap();
    vault.put_record(&record("old-unsynced", 90, false)).await.unwrap();
    vault.put_record(&record("recent-synced", 3, true)).await.unwrap();
    tokio::fs::write(vault.temp_dir().join("thumb.bin"), [0u8; 1000])
        .await
        .unwrap();

    let result = manager.smart_cleanup(true).await.unwrap();
    assert!(result.performed);
    assert!(result.bytes_freed >= 1000);

    let vault = manager.vault();
    assert!(vault.get_record(DataCategory::Health, "stale-synced").await.unwrap().is_none());
    assert!(vault.get_record(DataCategory::Health, "old-unsynced").await.unwrap().is_some());
    assert!(vault.get_record(DataCategory::Health, "recent-synced").await.unwrap().is_some());
    assert_eq!(vault.category_bytes(DataCategory::TempCache).await.unwrap(), 0);
}
