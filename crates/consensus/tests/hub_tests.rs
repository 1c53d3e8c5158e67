//! Tests for broadcasting and DFS publication

mod common;

use common::{cid, peer, MemoryDfs, RecordingSink};
use deltacore_config::HubConfig;
use deltacore_core::DfsError;
use deltacore_consensus::{ConsensusError, DeltaHub, RetryPolicy};
use deltacore_types::{
    CandidateDeltaBroadcast, ConsensusMessage, ContentHash, Delta, DeltaDfsHashBroadcast,
    FavouriteDeltaBroadcast,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn hub(dfs: Arc<MemoryDfs>, sink: Arc<RecordingSink>) -> DeltaHub {
    DeltaHub::new(sink, dfs, peer(1), RetryPolicy::default())
}

fn delta() -> Delta {
    Delta {
        previous_delta_dfs_hash: cid(b"previous"),
        merkle_root: ContentHash::keccak256(b"root"),
        ..Delta::default()
    }
}

fn candidate(producer: u8) -> CandidateDeltaBroadcast {
    CandidateDeltaBroadcast {
        hash: cid(b"candidate"),
        previous_delta_dfs_hash: cid(b"previous"),
        producer_id: peer(producer),
    }
}

#[test]
fn test_retry_policy_delays() {
    let policy = RetryPolicy::from(&HubConfig::default());
    assert_eq!(policy.max_attempts(), 5);
    assert_eq!(policy.delay_for(1), Duration::from_secs(2));
    assert_eq!(policy.delay_for(4), Duration::from_secs(16));
    assert_eq!(policy.delay_for(10), Duration::from_secs(64));
}

#[test]
fn test_only_local_candidates_broadcast() {
    let sink = Arc::new(RecordingSink::default());
    let hub = hub(Arc::new(MemoryDfs::default()), sink.clone());

    assert!(!hub.broadcast_candidate(&candidate(2)));
    assert!(sink.messages().is_empty());

    assert!(hub.broadcast_candidate(&candidate(1)));
    assert_eq!(sink.messages(), vec![ConsensusMessage::Candidate(candidate(1))]);
}

#[test]
fn test_favourites_always_forwarded() {
    let sink = Arc::new(RecordingSink::default());
    let hub = hub(Arc::new(MemoryDfs::default()), sink.clone());
    let favourite = FavouriteDeltaBroadcast {
        candidate: candidate(2),
        voter_id: peer(3),
    };

    hub.broadcast_favourite_candidate_delta(&favourite);
    assert_eq!(sink.messages(), vec![ConsensusMessage::Favourite(favourite)]);
}

#[tokio::test]
async fn test_publish_announces_address() {
    let dfs = Arc::new(MemoryDfs::default());
    let sink = Arc::new(RecordingSink::default());
    let hub = hub(dfs.clone(), sink.clone());

    let address = hub
        .publish_delta_to_dfs_and_broadcast_address(&delta(), &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(address, ContentHash::keccak256(&delta().to_rlp()).to_cid());
    assert_eq!(
        sink.messages(),
        vec![ConsensusMessage::DfsHash(DeltaDfsHashBroadcast {
            delta_dfs_hash: address,
            previous_delta_dfs_hash: cid(b"previous"),
        })]
    );
}

#[tokio::test(start_paused = true)]
async fn test_publish_retries_with_backoff() {
    let dfs = Arc::new(MemoryDfs::failing(3));
    let hub = hub(dfs.clone(), Arc::new(RecordingSink::default()));

    let started = tokio::time::Instant::now();
    let address = hub
        .publish_delta_to_dfs_and_broadcast_address(&delta(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(address.is_some());
    assert_eq!(dfs.adds(), 4);
    // 2s + 4s + 8s
    assert_eq!(started.elapsed(), Duration::from_secs(14));
}

#[tokio::test(start_paused = true)]
async fn test_publish_fails_after_all_attempts() {
    let dfs = Arc::new(MemoryDfs::failing(100));
    let sink = Arc::new(RecordingSink::default());
    let hub = hub(dfs.clone(), sink.clone());

    let result = hub
        .publish_delta_to_dfs_and_broadcast_address(&delta(), &CancellationToken::new())
        .await;

    let error = result.unwrap_err();
    assert!(std::error::Error::source(&error).is_some());
    match error {
        ConsensusError::PublishFailed {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 5);
            assert!(matches!(last_error, DfsError::Unavailable(_)));
        }
        other => panic!("expected publish failure, got {other:?}"),
    }
    assert_eq!(dfs.adds(), 5);
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start_is_abandoned() {
    let dfs = Arc::new(MemoryDfs::default());
    let hub = hub(dfs.clone(), Arc::new(RecordingSink::default()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = hub
        .publish_delta_to_dfs_and_broadcast_address(&delta(), &cancel)
        .await;
    assert!(matches!(result, Ok(None)));
    assert_eq!(dfs.adds(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_retrying() {
    let dfs = Arc::new(MemoryDfs::failing(100));
    let hub = Arc::new(hub(dfs.clone(), Arc::new(RecordingSink::default())));
    let cancel = CancellationToken::new();

    let task = {
        let hub = hub.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            hub.publish_delta_to_dfs_and_broadcast_address(&delta(), &cancel)
                .await
        })
    };

    // First attempt fails, second runs at 2s, then a 4s backoff starts
    tokio::time::sleep(Duration::from_secs(3)).await;
    cancel.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Ok(None)));
    assert_eq!(dfs.adds(), 2);
}
