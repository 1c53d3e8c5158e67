//! Tests for the round driver

mod common;

use common::{builder, delta_cache, entry, peer, pool_with, MemoryDfs, RecordingSink};
use deltacore_config::Config;
use deltacore_consensus::{
    Consensus, ConsensusComponents, ConsensusError, CycleEventsProvider, CycleSchedule, DeltaBuilderConfig,
    DeltaElector, DeltaHashProvider, DeltaHub, DeltaVoter, Phase, PhaseName, PhaseStatus,
    RetryPolicy, RoundAction,
};
use deltacore_core::{ManualClock, StaticProducersProvider};
use deltacore_types::{Cid, ConsensusMessage, DeltaDfsHashBroadcast, PeerId};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Node {
    consensus: Arc<Consensus>,
    hashes: Arc<DeltaHashProvider>,
    voter: Arc<DeltaVoter>,
    elector: Arc<DeltaElector>,
    sink: Arc<RecordingSink>,
}

fn node(local: PeerId, producers: Vec<PeerId>, dfs: Arc<MemoryDfs>) -> Node {
    let config = Config::default();
    let clock = Arc::new(ManualClock::new(0));
    let producers = Arc::new(StaticProducersProvider::new(producers));
    let cache = delta_cache(dfs.clone());
    let hashes = Arc::new(DeltaHashProvider::new(
        cache.genesis_hash(),
        clock.clone(),
        &config.history,
    ));
    let sink = Arc::new(RecordingSink::default());
    let voter = Arc::new(DeltaVoter::new(producers.clone(), local.clone(), &config.voting));
    let elector = Arc::new(DeltaElector::new(producers, &config.voting));

    let components = ConsensusComponents {
        builder: Arc::new(builder(
            pool_with(vec![entry(2, 21_000, b"a"), entry(1, 30_000, b"b")]),
            cache.clone(),
            local.clone(),
            DeltaBuilderConfig::default(),
        )),
        voter: voter.clone(),
        elector: elector.clone(),
        cache,
        hub: Arc::new(DeltaHub::new(
            sink.clone(),
            dfs,
            local.clone(),
            RetryPolicy::default(),
        )),
        hash_provider: hashes.clone(),
    };
    let cycle = Arc::new(CycleEventsProvider::new(
        CycleSchedule::default(),
        clock,
        hashes.clone(),
    ));

    Node {
        consensus: Arc::new(Consensus::new(components, cycle, local)),
        hashes,
        voter,
        elector,
        sink,
    }
}

fn producing(name: PhaseName, previous: Cid) -> Phase {
    Phase {
        name,
        status: PhaseStatus::Producing,
        previous_delta_dfs_hash: previous,
        at: 0,
    }
}

#[tokio::test]
async fn test_single_producer_round_advances_head() {
    let dfs = Arc::new(MemoryDfs::default());
    let node = node(peer(1), vec![peer(1)], dfs.clone());
    let genesis = node.hashes.latest();
    let cancel = CancellationToken::new();

    let built = node
        .consensus
        .handle_phase(&producing(PhaseName::Construction, genesis), &cancel)
        .await
        .unwrap();
    let RoundAction::CandidateBroadcast(candidate) = built else {
        panic!("expected a candidate, got {:?}", built);
    };

    assert_eq!(
        node.consensus
            .handle_phase(&producing(PhaseName::Campaigning, genesis), &cancel)
            .await
            .unwrap(),
        RoundAction::FavouriteBroadcast(candidate)
    );

    let published = node
        .consensus
        .handle_phase(&producing(PhaseName::Voting, genesis), &cancel)
        .await
        .unwrap();
    let RoundAction::Published(address) = published else {
        panic!("expected a publish, got {:?}", published);
    };

    assert_eq!(node.hashes.latest(), address);
    assert_eq!(dfs.adds(), 1);

    let messages = node.sink.messages();
    assert_eq!(messages.len(), 3);
    assert!(matches!(messages[0], ConsensusMessage::Candidate(_)));
    assert!(matches!(messages[1], ConsensusMessage::Favourite(_)));
    assert_eq!(
        messages[2],
        ConsensusMessage::DfsHash(DeltaDfsHashBroadcast {
            delta_dfs_hash: address,
            previous_delta_dfs_hash: genesis,
        })
    );
}

#[tokio::test]
async fn test_collecting_and_synchronisation_are_idle() {
    let node = node(peer(1), vec![peer(1)], Arc::new(MemoryDfs::default()));
    let genesis = node.hashes.latest();
    let cancel = CancellationToken::new();

    let collecting = Phase {
        status: PhaseStatus::Collecting,
        ..producing(PhaseName::Construction, genesis)
    };
    assert_eq!(
        node.consensus.handle_phase(&collecting, &cancel).await.unwrap(),
        RoundAction::Idle
    );
    assert_eq!(
        node.consensus
            .handle_phase(&producing(PhaseName::Synchronisation, genesis), &cancel)
            .await
            .unwrap(),
        RoundAction::Idle
    );
    assert_eq!(
        node.consensus
            .handle_phase(&producing(PhaseName::Voting, genesis), &cancel)
            .await
            .unwrap(),
        RoundAction::Idle
    );
    assert!(node.sink.messages().is_empty());
}

#[tokio::test]
async fn test_non_producer_construction_fails() {
    let node = node(peer(3), vec![peer(1), peer(2)], Arc::new(MemoryDfs::default()));
    let genesis = node.hashes.latest();

    let result = node
        .consensus
        .handle_phase(
            &producing(PhaseName::Construction, genesis),
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(ConsensusError::UnknownProducer { peer: local, previous }) => {
            assert_eq!(local, peer(3).to_string());
            assert_eq!(previous, genesis);
        }
        other => panic!("expected an unknown producer error, got {other:?}"),
    }
    assert!(node.sink.messages().is_empty());
    assert_eq!(node.voter.round_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_synchronisation_drops_expired_rounds() {
    let node = node(peer(1), vec![peer(1)], Arc::new(MemoryDfs::default()));
    let genesis = node.hashes.latest();
    let cancel = CancellationToken::new();

    node.consensus
        .handle_phase(&producing(PhaseName::Construction, genesis), &cancel)
        .await
        .unwrap();
    node.consensus
        .handle_phase(&producing(PhaseName::Campaigning, genesis), &cancel)
        .await
        .unwrap();
    assert_eq!(node.voter.round_count(), 1);
    assert_eq!(node.elector.round_count(), 1);

    let sync = producing(PhaseName::Synchronisation, genesis);
    node.consensus.handle_phase(&sync, &cancel).await.unwrap();
    assert_eq!(node.voter.round_count(), 1);
    assert_eq!(node.elector.round_count(), 1);

    tokio::time::advance(Duration::from_secs(181)).await;
    assert_eq!(
        node.consensus.handle_phase(&sync, &cancel).await.unwrap(),
        RoundAction::Idle
    );
    assert_eq!(node.voter.round_count(), 0);
    assert_eq!(node.elector.round_count(), 0);
}

#[tokio::test]
async fn test_peer_adopts_announced_delta() {
    let dfs = Arc::new(MemoryDfs::default());
    let producer = node(peer(1), vec![peer(1), peer(2)], dfs.clone());
    let follower = node(peer(2), vec![peer(1), peer(2)], dfs.clone());
    let genesis = producer.hashes.latest();
    let cancel = CancellationToken::new();

    for name in [PhaseName::Construction, PhaseName::Campaigning] {
        producer
            .consensus
            .handle_phase(&producing(name, genesis), &cancel)
            .await
            .unwrap();
    }
    let RoundAction::Published(address) = producer
        .consensus
        .handle_phase(&producing(PhaseName::Voting, genesis), &cancel)
        .await
        .unwrap()
    else {
        panic!("producer did not publish");
    };

    let announcement = DeltaDfsHashBroadcast {
        delta_dfs_hash: address,
        previous_delta_dfs_hash: genesis,
    };
    assert!(follower.consensus.on_delta_dfs_hash(&announcement).await);
    assert_eq!(follower.hashes.latest(), address);

    // Replays no longer extend the head
    assert!(!follower.consensus.on_delta_dfs_hash(&announcement).await);
}

#[tokio::test]
async fn test_announcement_with_wrong_predecessor_ignored() {
    let dfs = Arc::new(MemoryDfs::default());
    let follower = node(peer(2), vec![peer(1), peer(2)], dfs);
    let genesis = follower.hashes.latest();

    let announcement = DeltaDfsHashBroadcast {
        delta_dfs_hash: common::cid(b"unknown"),
        previous_delta_dfs_hash: genesis,
    };
    assert!(!follower.consensus.on_delta_dfs_hash(&announcement).await);
    assert_eq!(follower.hashes.latest(), genesis);
}

#[tokio::test(start_paused = true)]
async fn test_started_consensus_publishes_within_a_cycle() {
    let dfs = Arc::new(MemoryDfs::default());
    let node = node(peer(1), vec![peer(1)], dfs.clone());
    let genesis = node.hashes.latest();
    let cancel = CancellationToken::new();

    let task = node.consensus.clone().start(cancel.clone());
    tokio::time::sleep(Duration::from_secs(12)).await;
    cancel.cancel();
    task.await.unwrap();

    assert_ne!(node.hashes.latest(), genesis);
    assert_eq!(dfs.adds(), 1);
}
