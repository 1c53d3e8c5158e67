//! Shared fixtures for consensus integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use deltacore_config::Config;
use deltacore_consensus::{
    DeltaBuilder, DeltaBuilderConfig, DeltaBuilderDeps, DeltaCache, DeltaCacheConfig,
};
use deltacore_core::{
    BroadcastSink, ChaChaRandomFactory, DfsError, DfsReader, DfsResult, DfsWriter,
    KeccakHashProvider, ManualClock, NilStateRoot,
};
use deltacore_mempool::{Mempool, MempoolConfig, TransactionRetriever};
use deltacore_types::{Address, Cid, ConsensusMessage, ContentHash, PeerId, PublicEntry};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn peer(n: u8) -> PeerId {
    PeerId::from_bytes(vec![n; 32])
}

pub fn cid(tag: &[u8]) -> Cid {
    ContentHash::keccak256(tag).to_cid()
}

/// A transfer with the given price, gas and signature.
pub fn entry(gas_price: u128, gas_limit: u64, signature: &[u8]) -> PublicEntry {
    PublicEntry::transfer(Address::new([1; 20]), Address::new([2; 20]), 5)
        .with_gas(gas_price, gas_limit)
        .with_signature(signature.to_vec())
}

/// In-memory DFS addressing content by its keccak digest.
#[derive(Default)]
pub struct MemoryDfs {
    content: Mutex<HashMap<Cid, Bytes>>,
    pub reads: AtomicUsize,
    pub adds: AtomicUsize,
    failures_left: AtomicU32,
}

impl MemoryDfs {
    /// Fail the next `n` writes.
    pub fn failing(n: u32) -> Self {
        let dfs = Self::default();
        dfs.failures_left.store(n, Ordering::SeqCst);
        dfs
    }

    pub fn put(&self, content: Vec<u8>) -> Cid {
        let cid = ContentHash::keccak256(&content).to_cid();
        self.content.lock().insert(cid, Bytes::from(content));
        cid
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DfsReader for MemoryDfs {
    async fn read(&self, cid: &Cid) -> DfsResult<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.content
            .lock()
            .get(cid)
            .cloned()
            .ok_or(DfsError::NotFound(*cid))
    }
}

#[async_trait]
impl DfsWriter for MemoryDfs {
    async fn add(&self, content: Bytes, _name: &str, cancel: &CancellationToken) -> DfsResult<Cid> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(DfsError::Cancelled);
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DfsError::Unavailable("injected failure".to_string()));
        }
        Ok(self.put(content.to_vec()))
    }
}

/// Broadcast sink that keeps every message.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<ConsensusMessage>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<ConsensusMessage> {
        self.messages.lock().clone()
    }
}

impl BroadcastSink for RecordingSink {
    fn broadcast(&self, message: ConsensusMessage) {
        self.messages.lock().push(message);
    }
}

pub fn delta_cache(dfs: Arc<MemoryDfs>) -> Arc<DeltaCache> {
    Arc::new(DeltaCache::new(
        dfs,
        &KeccakHashProvider,
        DeltaCacheConfig::from(&Config::default().cache),
    ))
}

/// Builder over `pool` producing as `local`.
pub fn builder(
    pool: Arc<Mempool>,
    cache: Arc<DeltaCache>,
    local: PeerId,
    config: DeltaBuilderConfig,
) -> DeltaBuilder {
    DeltaBuilder::new(
        DeltaBuilderDeps {
            retriever: Arc::new(TransactionRetriever::new(pool)),
            random_factory: Arc::new(ChaChaRandomFactory),
            hash_provider: Arc::new(KeccakHashProvider),
            cache,
            state_root: Arc::new(NilStateRoot),
            clock: Arc::new(ManualClock::new(1_700_000_000_000)),
        },
        local,
        config,
    )
}

pub fn pool_with(entries: Vec<PublicEntry>) -> Arc<Mempool> {
    let pool = Arc::new(Mempool::new(MempoolConfig::default()));
    for e in entries {
        pool.add_entry(e).unwrap();
    }
    pool
}
