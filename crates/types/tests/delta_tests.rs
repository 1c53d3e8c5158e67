//! Tests for Delta and the round broadcast types

use deltacore_types::{
    Address, CandidateDeltaBroadcast, Cid, CoinbaseEntry, ContentHash, Delta,
    FavouriteDeltaBroadcast, PeerId, PublicEntry,
};

fn cid(tag: &[u8]) -> Cid {
    ContentHash::keccak256(tag).to_cid()
}

fn sample_delta() -> Delta {
    Delta {
        previous_delta_dfs_hash: cid(b"previous"),
        merkle_root: ContentHash::keccak256(b"content"),
        state_root: ContentHash::NIL,
        timestamp: 1_000,
        public_entries: vec![
            PublicEntry::transfer(Address::new([1; 20]), Address::new([2; 20]), 3)
                .with_gas(2, 21_000),
            PublicEntry::deploy(Address::new([1; 20]), vec![0x60]).with_gas(1, 30_000),
        ],
        coinbase_entries: vec![CoinbaseEntry {
            amount: 72_000,
            receiver_public_key: vec![5u8; 32].into(),
        }],
    }
}

#[test]
fn test_genesis_is_not_structurally_valid() {
    let genesis = Delta::genesis();
    assert!(genesis.previous_delta_dfs_hash.is_nil());
    assert!(!genesis.is_structurally_valid());
}

#[test]
fn test_structural_validity_requires_both_hashes() {
    let mut delta = sample_delta();
    assert!(delta.is_structurally_valid());

    delta.merkle_root = ContentHash::NIL;
    assert!(!delta.is_structurally_valid());

    let mut delta = sample_delta();
    delta.previous_delta_dfs_hash = Cid::NIL;
    assert!(!delta.is_structurally_valid());
}

#[test]
fn test_delta_rlp_roundtrip() {
    let delta = sample_delta();
    let decoded = Delta::from_rlp(&delta.to_rlp()).unwrap();
    assert_eq!(decoded, delta);
}

#[test]
fn test_delta_decode_rejects_garbage() {
    assert!(Delta::from_rlp(&[]).is_err());
    assert!(Delta::from_rlp(&[0xc1, 0x80]).is_err());
}

#[test]
fn test_contract_entries_and_fees() {
    let delta = sample_delta();
    assert_eq!(delta.contract_entries().count(), 1);
    assert_eq!(delta.total_fees(), 42_000 + 30_000);
}

#[test]
fn test_candidate_validity() {
    let candidate = CandidateDeltaBroadcast {
        hash: cid(b"candidate"),
        previous_delta_dfs_hash: cid(b"previous"),
        producer_id: PeerId::from_bytes(vec![1u8; 32]),
    };
    assert!(candidate.is_valid());

    let mut missing_producer = candidate.clone();
    missing_producer.producer_id = PeerId::default();
    assert!(!missing_producer.is_valid());

    let mut missing_hash = candidate;
    missing_hash.hash = Cid::NIL;
    assert!(!missing_hash.is_valid());
}

#[test]
fn test_favourite_key_ignores_producer_and_previous_hash() {
    let voter = PeerId::from_bytes(vec![9u8; 32]);
    let a = FavouriteDeltaBroadcast {
        candidate: CandidateDeltaBroadcast {
            hash: cid(b"candidate"),
            previous_delta_dfs_hash: cid(b"p1"),
            producer_id: PeerId::from_bytes(vec![1u8; 32]),
        },
        voter_id: voter.clone(),
    };
    let mut b = a.clone();
    b.candidate.previous_delta_dfs_hash = cid(b"p2");
    b.candidate.producer_id = PeerId::from_bytes(vec![2u8; 32]);

    assert_ne!(a, b);
    assert_eq!(a.key(), b.key());

    let mut c = a.clone();
    c.voter_id = PeerId::from_bytes(vec![8u8; 32]);
    assert_ne!(a.key(), c.key());
}

#[test]
fn test_announcement_json_uses_cid_strings() {
    let message = deltacore_types::ConsensusMessage::DfsHash(deltacore_types::DeltaDfsHashBroadcast {
        delta_dfs_hash: cid(b"delta"),
        previous_delta_dfs_hash: cid(b"previous"),
    });

    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(
        json["DfsHash"]["delta_dfs_hash"],
        serde_json::Value::String(cid(b"delta").to_string())
    );

    let back: deltacore_types::ConsensusMessage = serde_json::from_value(json).unwrap();
    assert_eq!(back, message);
}
