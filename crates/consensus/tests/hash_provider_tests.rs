//! Tests for the confirmed hash history

mod common;

use common::cid;
use deltacore_config::HistoryConfig;
use deltacore_consensus::DeltaHashProvider;
use deltacore_core::ManualClock;
use std::sync::Arc;

fn provider(capacity: usize) -> (DeltaHashProvider, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let config = HistoryConfig {
        capacity,
        ..HistoryConfig::default()
    };
    (DeltaHashProvider::new(cid(b"genesis"), clock.clone(), &config), clock)
}

#[test]
fn test_seeded_with_genesis() {
    let (provider, _) = provider(10);
    assert_eq!(provider.latest(), cid(b"genesis"));
    assert_eq!(provider.history().len(), 1);
    assert_eq!(provider.history()[0].confirmed_at, 0);
    assert_eq!(provider.get_latest_delta_hash(None), Some(cid(b"genesis")));
}

#[test]
fn test_update_requires_current_head() {
    let (provider, _) = provider(10);

    assert!(!provider.try_update_latest_hash(&cid(b"stale"), &cid(b"d1")));
    assert_eq!(provider.history().len(), 1);

    assert!(provider.try_update_latest_hash(&cid(b"genesis"), &cid(b"d1")));
    assert_eq!(provider.latest(), cid(b"d1"));

    assert!(!provider.try_update_latest_hash(&cid(b"genesis"), &cid(b"d2")));
    assert_eq!(provider.latest(), cid(b"d1"));
}

#[test]
fn test_duplicate_confirmation_rejected() {
    let (provider, _) = provider(10);
    provider.try_update_latest_hash(&cid(b"genesis"), &cid(b"d1"));

    assert!(!provider.try_update_latest_hash(&cid(b"d1"), &cid(b"d1")));
    assert!(!provider.try_update_latest_hash(&cid(b"d1"), &cid(b"genesis")));
    assert_eq!(provider.history().len(), 2);
}

#[test]
fn test_oldest_evicted_past_capacity() {
    let (provider, _) = provider(3);
    let hashes: Vec<_> = (0u8..4).map(|i| cid(&[i])).collect();

    let mut head = cid(b"genesis");
    for hash in &hashes {
        assert!(provider.try_update_latest_hash(&head, hash));
        head = *hash;
    }

    let history: Vec<_> = provider.history().iter().map(|e| e.hash).collect();
    assert_eq!(history, vec![hashes[3], hashes[2], hashes[1]]);
}

#[test]
fn test_lookup_as_of() {
    let (provider, clock) = provider(2);

    clock.set(2_000);
    provider.try_update_latest_hash(&cid(b"genesis"), &cid(b"d1"));
    clock.set(3_000);
    provider.try_update_latest_hash(&cid(b"d1"), &cid(b"d2"));

    assert_eq!(provider.get_latest_delta_hash(Some(3_500)), Some(cid(b"d2")));
    assert_eq!(provider.get_latest_delta_hash(Some(2_999)), Some(cid(b"d1")));
    assert_eq!(provider.get_latest_delta_hash(None), Some(cid(b"d2")));
    // Genesis was evicted, so nothing is known before d1
    assert_eq!(provider.get_latest_delta_hash(Some(1_000)), None);
}

#[tokio::test]
async fn test_subscribers_see_new_heads() {
    let (provider, _) = provider(10);
    let mut updates = provider.subscribe();

    provider.try_update_latest_hash(&cid(b"genesis"), &cid(b"d1"));
    provider.try_update_latest_hash(&cid(b"wrong"), &cid(b"d2"));
    provider.try_update_latest_hash(&cid(b"d1"), &cid(b"d3"));

    assert_eq!(updates.recv().await.unwrap(), cid(b"d1"));
    assert_eq!(updates.recv().await.unwrap(), cid(b"d3"));
    assert!(updates.try_recv().is_err());
}
