//! Tests for PublicEntry and CoinbaseEntry

use deltacore_types::{Address, CoinbaseEntry, EntryKind, PublicEntry};

fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

#[test]
fn test_entry_kinds() {
    let transfer = PublicEntry::transfer(addr(1), addr(2), 5);
    assert_eq!(transfer.kind(), EntryKind::Transfer);

    let call = PublicEntry::transfer(addr(1), addr(2), 0).with_data(vec![0xde, 0xad]);
    assert_eq!(call.kind(), EntryKind::ContractCall);

    let deploy = PublicEntry::deploy(addr(1), vec![0x60, 0x80]);
    assert_eq!(deploy.kind(), EntryKind::ContractDeployment);

    let empty = PublicEntry::default();
    assert_eq!(empty.kind(), EntryKind::Invalid);
    assert!(!empty.kind().is_accepted());
}

#[test]
fn test_fee_saturates() {
    let entry = PublicEntry::transfer(addr(1), addr(2), 0).with_gas(u128::MAX, 2);
    assert_eq!(entry.fee(), u128::MAX);

    let entry = PublicEntry::transfer(addr(1), addr(2), 0).with_gas(3, 21_000);
    assert_eq!(entry.fee(), 63_000);
}

#[test]
fn test_entry_rlp_preserves_missing_receiver() {
    let deploy = PublicEntry::deploy(addr(7), vec![1, 2, 3])
        .with_gas(9, 50_000)
        .with_timestamp(1_700_000_000_000)
        .with_signature(vec![0xaa; 64]);

    let decoded = PublicEntry::from_rlp(&deploy.to_rlp()).unwrap();
    assert_eq!(decoded, deploy);
    assert!(decoded.receiver.is_none());
}

#[test]
fn test_entry_bytes_differ_by_signature() {
    let a = PublicEntry::transfer(addr(1), addr(2), 5).with_signature(vec![1]);
    let b = PublicEntry::transfer(addr(1), addr(2), 5).with_signature(vec![2]);
    assert_ne!(a.to_rlp(), b.to_rlp());
}

#[test]
fn test_coinbase_encoding_is_stable() {
    let coinbase = CoinbaseEntry {
        amount: 0,
        receiver_public_key: vec![9u8; 32].into(),
    };
    assert_eq!(coinbase.to_rlp(), coinbase.clone().to_rlp());
    assert!(!coinbase.to_rlp().is_empty());
}
