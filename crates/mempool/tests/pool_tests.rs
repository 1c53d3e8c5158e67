//! Tests for the in-memory pool

use deltacore_core::MempoolReader;
use deltacore_mempool::{Mempool, MempoolConfig, MempoolError};
use deltacore_types::{Address, PublicEntry};

fn entry(nonce: u64) -> PublicEntry {
    PublicEntry {
        nonce,
        ..PublicEntry::transfer(Address::ZERO, Address::new([3; 20]), 10)
    }
}

#[test]
fn test_add_and_remove() {
    let pool = Mempool::new(MempoolConfig::default());
    let id = pool.add_entry(entry(0)).unwrap();

    assert!(pool.contains(&id));
    assert_eq!(pool.remove(&id), Some(entry(0)));
    assert!(pool.is_empty());
    assert_eq!(pool.remove(&id), None);
}

#[test]
fn test_entry_id_is_content_derived() {
    assert_eq!(Mempool::entry_id(&entry(1)), Mempool::entry_id(&entry(1)));
    assert_ne!(Mempool::entry_id(&entry(1)), Mempool::entry_id(&entry(2)));
}

#[test]
fn test_pool_full_after_max_size() {
    let pool = Mempool::new(MempoolConfig { max_size: 3 });
    for nonce in 0..3 {
        pool.add_entry(entry(nonce)).unwrap();
    }
    assert_eq!(pool.add_entry(entry(3)), Err(MempoolError::PoolFull));

    pool.clear();
    assert!(pool.add_entry(entry(3)).is_ok());
}

#[test]
fn test_reader_sees_all_entries() {
    let pool = Mempool::new(MempoolConfig::default());
    for nonce in 0..5 {
        pool.add_entry(entry(nonce)).unwrap();
    }
    let mut nonces: Vec<u64> = pool.get_all().iter().map(|e| e.nonce).collect();
    nonces.sort_unstable();
    assert_eq!(nonces, vec![0, 1, 2, 3, 4]);
    assert_eq!(pool.stats().count, 5);
}
