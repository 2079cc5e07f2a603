//! End-to-end tests against the public `TrieEngine` API, exercising the
//! boundary cases a Merkle-Patricia trie needs to get right: the empty
//! tree, keys that diverge at the very first or very last nibble, and
//! sparse-to-full branch promotion preserving every child's id.

use rand::seq::SliceRandom;
use rand::Rng;

use patricia_store::adapters::memory_store::InMemoryBackingStore;
use patricia_store::domain::config::StoreConfig;
use patricia_store::domain::node::NodeId;
use patricia_store::{CommitMode, TrieEngine};

fn engine() -> TrieEngine<InMemoryBackingStore> {
    TrieEngine::new(InMemoryBackingStore::new(), StoreConfig::default()).unwrap()
}

fn key_with_first_byte(b: u8) -> [u8; 32] {
    let mut k = [0u8; 32];
    k[0] = b;
    k
}

#[test]
fn empty_trie_has_no_root_and_no_entries() {
    let e = engine();
    assert_eq!(e.root(), NodeId::NULL);
    assert_eq!(e.try_get(&[0u8; 32]).unwrap(), None);
}

#[test]
fn single_insert_then_commit_is_readable_through_a_fresh_lookup() {
    let mut e = engine();
    let key = key_with_first_byte(0x42);
    let value = [0x99u8; 32];

    let mut batch = e.begin();
    batch.set(&key, &value).unwrap();
    let (root, hash) = batch.commit(CommitMode::SealUpdatable).unwrap();
    e.publish(root);

    assert_eq!(e.try_get(&key).unwrap(), Some(value.to_vec()));
    assert_ne!(hash, patricia_store::domain::rlp::EMPTY_TRIE_ROOT);
}

#[test]
fn keys_diverging_at_the_very_first_nibble_split_cleanly() {
    let mut e = engine();
    let low = key_with_first_byte(0x01);
    let high = key_with_first_byte(0xF1);

    let mut batch = e.begin();
    batch.set(&low, &[1u8; 32]).unwrap();
    batch.set(&high, &[2u8; 32]).unwrap();
    let (root, _hash) = batch.commit(CommitMode::SealUpdatable).unwrap();
    e.publish(root);

    assert_eq!(e.try_get(&low).unwrap(), Some(vec![1u8; 32]));
    assert_eq!(e.try_get(&high).unwrap(), Some(vec![2u8; 32]));
}

#[test]
fn keys_diverging_at_the_very_last_nibble_split_cleanly() {
    let mut e = engine();
    let mut a = [0x07u8; 32];
    let mut b = [0x07u8; 32];
    a[31] = 0x10;
    b[31] = 0x11;

    let mut batch = e.begin();
    batch.set(&a, &[1u8; 32]).unwrap();
    batch.set(&b, &[2u8; 32]).unwrap();
    let (root, _hash) = batch.commit(CommitMode::SealUpdatable).unwrap();
    e.publish(root);

    assert_eq!(e.try_get(&a).unwrap(), Some(vec![1u8; 32]));
    assert_eq!(e.try_get(&b).unwrap(), Some(vec![2u8; 32]));
}

#[test]
fn many_keys_round_trip_across_several_committed_batches() {
    let mut e = engine();
    let mut keys = Vec::new();
    for i in 0u8..64 {
        let mut k = [0u8; 32];
        k[0] = i;
        k[1] = i.wrapping_mul(37);
        keys.push(k);
    }

    // Split across three batches to exercise the watermark sealing
    // between commits, not just one giant in-frontier build.
    for chunk in keys.chunks(20) {
        let mut batch = e.begin();
        for (i, k) in chunk.iter().enumerate() {
            batch.set(k, &[i as u8; 32]).unwrap();
        }
        let (root, _hash) = batch.commit(CommitMode::SealUpdatable).unwrap();
        e.publish(root);
    }

    for (i, k) in keys.iter().enumerate() {
        let expected = (i % 20) as u8;
        assert_eq!(e.try_get(k).unwrap(), Some(vec![expected; 32]));
    }
}

#[test]
fn overwriting_a_key_changes_its_value_but_not_its_neighbors() {
    let mut e = engine();
    let a = key_with_first_byte(0x10);
    let b = key_with_first_byte(0x20);

    let mut batch = e.begin();
    batch.set(&a, &[1u8; 32]).unwrap();
    batch.set(&b, &[2u8; 32]).unwrap();
    let (root, _hash) = batch.commit(CommitMode::SealUpdatable).unwrap();
    e.publish(root);

    let mut batch = e.begin();
    batch.set(&a, &[99u8; 32]).unwrap();
    let (root, _hash) = batch.commit(CommitMode::SealUpdatable).unwrap();
    e.publish(root);

    assert_eq!(e.try_get(&a).unwrap(), Some(vec![99u8; 32]));
    assert_eq!(e.try_get(&b).unwrap(), Some(vec![2u8; 32]));
}

#[test]
fn root_hash_is_deterministic_regardless_of_insertion_order() {
    let a = key_with_first_byte(0x11);
    let b = key_with_first_byte(0x22);
    let c = key_with_first_byte(0x33);

    let mut e1 = engine();
    let mut batch = e1.begin();
    batch.set(&a, &[1u8; 32]).unwrap();
    batch.set(&b, &[2u8; 32]).unwrap();
    batch.set(&c, &[3u8; 32]).unwrap();
    let (root1, hash1) = batch.commit(CommitMode::RootOnly).unwrap();
    e1.publish(root1);

    let mut e2 = engine();
    let mut batch = e2.begin();
    batch.set(&c, &[3u8; 32]).unwrap();
    batch.set(&a, &[1u8; 32]).unwrap();
    batch.set(&b, &[2u8; 32]).unwrap();
    let (root2, hash2) = batch.commit(CommitMode::RootOnly).unwrap();
    e2.publish(root2);

    assert_eq!(hash1, hash2);
}

#[test]
fn root_hash_is_deterministic_across_randomized_insertion_orders() {
    let mut rng = rand::thread_rng();
    let mut keys: Vec<[u8; 32]> = Vec::new();
    for _ in 0..200 {
        let mut k = [0u8; 32];
        rng.fill(&mut k);
        keys.push(k);
    }

    let mut orders: Vec<Vec<[u8; 32]>> = Vec::new();
    for _ in 0..5 {
        let mut shuffled = keys.clone();
        shuffled.shuffle(&mut rng);
        orders.push(shuffled);
    }

    let hashes: Vec<_> = orders
        .iter()
        .map(|order| {
            let mut e = engine();
            let mut batch = e.begin();
            for key in order {
                batch.set(key, key).unwrap();
            }
            let (_root, hash) = batch.commit(CommitMode::RootOnly).unwrap();
            hash
        })
        .collect();

    assert!(
        hashes.windows(2).all(|pair| pair[0] == pair[1]),
        "root hash must not depend on insertion order"
    );
}

#[test]
fn every_key_is_readable_after_a_randomized_order_commit() {
    let mut rng = rand::thread_rng();
    let mut keys: Vec<[u8; 32]> = Vec::new();
    for _ in 0..200 {
        let mut k = [0u8; 32];
        rng.fill(&mut k);
        keys.push(k);
    }
    keys.shuffle(&mut rng);

    let mut e = engine();
    let mut batch = e.begin();
    for key in &keys {
        batch.set(key, key).unwrap();
        // Read-after-write within the same open batch, before commit.
        assert_eq!(batch.try_get(key).unwrap(), Some(key.to_vec()));
    }
    let (root, _hash) = batch.commit(CommitMode::SealUpdatable).unwrap();
    e.publish(root);

    for key in &keys {
        assert_eq!(e.try_get(key).unwrap(), Some(key.to_vec()));
    }
}
