use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rb_collections::{Error, RBTreeMap};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 5_000;

/// Keys drawn from a range smaller than TEST_SIZE so that collisions are common.
fn key_strategy() -> impl Strategy<Value = i64> {
    -2_000i64..2_000i64
}

fn value_strategy() -> impl Strategy<Value = i64> {
    any::<i64>()
}

/// Builds the model the way `RBTreeMap`'s `Extend` does: the first occurrence of a key wins.
fn first_wins(entries: &[(i64, i64)]) -> BTreeMap<i64, i64> {
    let mut model = BTreeMap::new();
    for &(k, v) in entries {
        model.entry(k).or_insert(v);
    }
    model
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum MapOp {
    Insert(i64, i64),
    InsertOrAssign(i64, i64),
    Remove(i64),
    Get(i64),
    ContainsKey(i64),
    LowerBound(i64),
    UpperBound(i64),
    FirstKeyValue,
    LastKeyValue,
    PopFirst,
    PopLast,
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        5 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        2 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::InsertOrAssign(k, v)),
        4 => key_strategy().prop_map(MapOp::Remove),
        2 => key_strategy().prop_map(MapOp::Get),
        1 => key_strategy().prop_map(MapOp::ContainsKey),
        1 => key_strategy().prop_map(MapOp::LowerBound),
        1 => key_strategy().prop_map(MapOp::UpperBound),
        1 => Just(MapOp::FirstKeyValue),
        1 => Just(MapOp::LastKeyValue),
        1 => Just(MapOp::PopFirst),
        1 => Just(MapOp::PopLast),
    ]
}

// ─── Core operations ─────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of operations on both RBTreeMap and BTreeMap and asserts
    /// identical results at every step.
    #[test]
    fn map_ops_match_btreemap(ops in proptest::collection::vec(map_op_strategy(), TEST_SIZE)) {
        let mut rb_map: RBTreeMap<i64, i64> = RBTreeMap::new();
        let mut bt_map: BTreeMap<i64, i64> = BTreeMap::new();

        for op in &ops {
            match op {
                MapOp::Insert(k, v) => {
                    let (cursor, inserted) = rb_map.insert(*k, *v);
                    let stored = cursor.value().copied();
                    let expected_inserted = !bt_map.contains_key(k);
                    let expected_value = *bt_map.entry(*k).or_insert(*v);
                    prop_assert_eq!(inserted, expected_inserted, "insert({}, {})", k, v);
                    prop_assert_eq!(stored, Some(expected_value), "insert({}, {})", k, v);
                }
                MapOp::InsertOrAssign(k, v) => {
                    let (cursor, inserted) = rb_map.insert_or_assign(*k, *v);
                    prop_assert_eq!(cursor.value(), Some(v));
                    prop_assert_eq!(inserted, bt_map.insert(*k, *v).is_none(), "insert_or_assign({}, {})", k, v);
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(rb_map.remove(k), bt_map.remove(k), "remove({})", k);
                }
                MapOp::Get(k) => {
                    prop_assert_eq!(rb_map.get(k), bt_map.get(k), "get({})", k);
                }
                MapOp::ContainsKey(k) => {
                    prop_assert_eq!(rb_map.contains_key(k), bt_map.contains_key(k), "contains_key({})", k);
                }
                MapOp::LowerBound(k) => {
                    let expected = bt_map.range(*k..).next();
                    prop_assert_eq!(rb_map.lower_bound(k).key_value(), expected, "lower_bound({})", k);
                }
                MapOp::UpperBound(k) => {
                    let expected = bt_map.range(k + 1..).next();
                    prop_assert_eq!(rb_map.upper_bound(k).key_value(), expected, "upper_bound({})", k);
                }
                MapOp::FirstKeyValue => {
                    prop_assert_eq!(rb_map.first_key_value(), bt_map.first_key_value());
                }
                MapOp::LastKeyValue => {
                    prop_assert_eq!(rb_map.last_key_value(), bt_map.last_key_value());
                }
                MapOp::PopFirst => {
                    prop_assert_eq!(rb_map.pop_first(), bt_map.pop_first());
                }
                MapOp::PopLast => {
                    prop_assert_eq!(rb_map.pop_last(), bt_map.pop_last());
                }
            }
            prop_assert_eq!(rb_map.len(), bt_map.len());
        }

        prop_assert!(rb_map.iter().eq(bt_map.iter()));
    }

    #[test]
    fn iter_matches_btreemap(entries in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE)) {
        let rb_map: RBTreeMap<i64, i64> = entries.iter().copied().collect();
        let bt_map = first_wins(&entries);

        prop_assert_eq!(rb_map.len(), bt_map.len());
        prop_assert!(rb_map.iter().eq(bt_map.iter()));
        prop_assert!(rb_map.iter().rev().eq(bt_map.iter().rev()));
        prop_assert!(rb_map.keys().eq(bt_map.keys()));
        prop_assert!(rb_map.values().eq(bt_map.values()));
        prop_assert!(rb_map.clone().into_iter().eq(bt_map.clone()));
        prop_assert!(rb_map.clone().into_keys().eq(bt_map.clone().into_keys()));
        prop_assert!(rb_map.into_values().rev().eq(bt_map.into_values().rev()));
    }

    /// Alternates `next` and `next_back` and checks the two ends meet without overlap.
    #[test]
    fn iter_size_and_double_ended(entries in proptest::collection::vec((key_strategy(), value_strategy()), 1..TEST_SIZE)) {
        let rb_map: RBTreeMap<i64, i64> = entries.iter().copied().collect();
        let bt_map = first_wins(&entries);

        let mut rb_iter = rb_map.iter();
        let mut bt_iter = bt_map.iter();
        let mut front = true;
        loop {
            prop_assert_eq!(rb_iter.len(), bt_iter.len());
            let (rb_next, bt_next) = if front {
                (rb_iter.next(), bt_iter.next())
            } else {
                (rb_iter.next_back(), bt_iter.next_back())
            };
            prop_assert_eq!(rb_next, bt_next);
            if rb_next.is_none() {
                break;
            }
            front = !front;
        }
        prop_assert_eq!(rb_iter.next(), None);
        prop_assert_eq!(rb_iter.next_back(), None);
    }

    #[test]
    fn iter_mut_matches(entries in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE)) {
        let mut rb_map: RBTreeMap<i64, i64> = entries.iter().copied().collect();
        let mut bt_map = first_wins(&entries);

        for (k, v) in rb_map.iter_mut() {
            *v = v.wrapping_add(*k);
        }
        for (k, v) in &mut bt_map {
            *v = v.wrapping_add(*k);
        }
        prop_assert!(rb_map.iter().eq(bt_map.iter()));

        for v in rb_map.values_mut().rev() {
            *v = v.wrapping_mul(3);
        }
        for v in bt_map.values_mut() {
            *v = v.wrapping_mul(3);
        }
        prop_assert!(rb_map.iter().eq(bt_map.iter()));
    }

    #[test]
    fn get_mut_matches_btreemap(
        entries in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE),
        probes in proptest::collection::vec(key_strategy(), 100),
    ) {
        let mut rb_map: RBTreeMap<i64, i64> = entries.iter().copied().collect();
        let mut bt_map = first_wins(&entries);

        for k in &probes {
            if let Some(v) = rb_map.get_mut(k) {
                *v = v.wrapping_sub(1);
            }
            if let Some(v) = bt_map.get_mut(k) {
                *v = v.wrapping_sub(1);
            }
            prop_assert_eq!(rb_map.at(k).ok(), bt_map.get(k));
        }
        prop_assert!(rb_map.iter().eq(bt_map.iter()));
    }

    /// Removes every entry one at a time through a cursor, in key order.
    #[test]
    fn cursor_remove_drains_in_order(entries in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE)) {
        let mut rb_map: RBTreeMap<i64, i64> = entries.iter().copied().collect();
        let bt_map = first_wins(&entries);

        let mut removed = Vec::new();
        let mut cursor = rb_map.cursor_front_mut();
        while let Some(entry) = cursor.remove_current() {
            removed.push(entry);
        }
        prop_assert!(cursor.is_end());
        prop_assert!(rb_map.is_empty());
        prop_assert_eq!(removed, bt_map.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn merge_moves_only_new_keys(
        a in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE),
        b in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE),
    ) {
        let mut rb_a: RBTreeMap<i64, i64> = a.iter().copied().collect();
        let mut rb_b: RBTreeMap<i64, i64> = b.iter().copied().collect();
        let bt_a = first_wins(&a);
        let bt_b = first_wins(&b);

        rb_a.merge(&mut rb_b);

        let mut expected_a = bt_a.clone();
        let mut expected_b = BTreeMap::new();
        for (k, v) in bt_b {
            if bt_a.contains_key(&k) {
                expected_b.insert(k, v);
            } else {
                expected_a.insert(k, v);
            }
        }
        prop_assert!(rb_a.iter().eq(expected_a.iter()));
        prop_assert!(rb_b.iter().eq(expected_b.iter()));
    }

    #[test]
    fn clone_produces_equal_map(entries in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE)) {
        let rb_map: RBTreeMap<i64, i64> = entries.iter().copied().collect();
        let mut cloned = rb_map.clone();
        prop_assert_eq!(&cloned, &rb_map);
        prop_assert_eq!(cloned.structure().to_string(), rb_map.structure().to_string());

        // The clone owns its nodes.
        cloned.clear();
        prop_assert!(cloned.is_empty());
        prop_assert_eq!(rb_map.len(), first_wins(&entries).len());
    }

    #[test]
    fn ord_matches_btreemap(
        a in proptest::collection::vec((key_strategy(), value_strategy()), 0..50),
        b in proptest::collection::vec((key_strategy(), value_strategy()), 0..50),
    ) {
        let rb_a: RBTreeMap<i64, i64> = a.iter().copied().collect();
        let rb_b: RBTreeMap<i64, i64> = b.iter().copied().collect();
        let bt_a = first_wins(&a);
        let bt_b = first_wins(&b);
        prop_assert_eq!(rb_a == rb_b, bt_a == bt_b);
        prop_assert_eq!(rb_a.cmp(&rb_b), bt_a.cmp(&bt_b));
        prop_assert_eq!(rb_a.partial_cmp(&rb_b), bt_a.partial_cmp(&bt_b));
    }

    #[test]
    fn hash_consistent_for_equal_maps(entries in proptest::collection::vec((key_strategy(), value_strategy()), TEST_SIZE)) {
        let forward: RBTreeMap<i64, i64> = entries.iter().copied().collect();
        // Reinserting the surviving entries in reverse order yields an equal map with a
        // different shape.
        let reversed: RBTreeMap<i64, i64> = forward.clone().into_iter().rev().collect();
        prop_assert_eq!(&forward, &reversed);
        prop_assert_eq!(hash_of(&forward), hash_of(&reversed));
    }
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn duplicate_key_keeps_the_first_value() {
    let mut map = RBTreeMap::new();
    map.insert(1, "one");
    let (cursor, inserted) = map.insert(1, "two");
    assert!(!inserted);
    assert_eq!(cursor.key_value(), Some((&1, &"one")));
    map.insert(3, "three");

    assert_eq!(map.len(), 2);
    assert_eq!(map.find(&1).value(), Some(&"one"));
    assert_eq!(map.insert_many([(3, "drei"), (4, "four")]), [false, true]);
    assert_eq!(map.len(), 3);

    let built = RBTreeMap::from([(1, "one"), (1, "two"), (3, "three")]);
    assert_eq!(built.len(), 2);
    assert_eq!(built.find(&1).value(), Some(&"one"));
}

#[test]
fn insert_or_assign_overwrites() {
    let mut map = RBTreeMap::from([(1, "one")]);
    let (cursor, inserted) = map.insert_or_assign(1, "uno");
    assert!(!inserted);
    assert_eq!(cursor.value(), Some(&"uno"));
    assert_eq!(map[&1], "uno");
    assert_eq!(map.len(), 1);
}

#[test]
fn merge_leaves_colliding_keys_behind() {
    let mut target = RBTreeMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);
    let mut source = RBTreeMap::from([(1, 'x'), (0, 'y'), (-1, 'z')]);
    target.merge(&mut source);

    assert_eq!(target.len(), 5);
    assert_eq!(source.len(), 1);
    assert_eq!(source.get(&1), Some(&'x'));
    assert_eq!(target[&1], 'a');
    assert_eq!(target.keys().copied().collect::<Vec<_>>(), [-1, 0, 1, 2, 3]);
}

#[test]
fn at_reports_missing_keys() {
    let mut map = RBTreeMap::from([(1, 10)]);
    assert_eq!(map.at(&1), Ok(&10));
    assert_eq!(map.at(&2), Err(Error::KeyNotFound));
    assert_eq!(map.at_mut(&2), Err(Error::KeyNotFound));
    *map.at_mut(&1).unwrap() += 1;
    assert_eq!(map[&1], 11);
    assert_eq!(Error::KeyNotFound.to_string(), "the entry does not exist");
}

#[test]
#[should_panic(expected = "no entry found for key")]
fn index_missing_key_panics() {
    let map = RBTreeMap::from([(1, 10)]);
    let _value = map[&2];
}

#[test]
fn get_or_insert_default_inserts_once() {
    let mut counts: RBTreeMap<&str, u32> = RBTreeMap::new();
    for word in ["b", "a", "b", "c", "b"] {
        *counts.get_or_insert_default(word) += 1;
    }
    assert_eq!(counts.into_iter().collect::<Vec<_>>(), [("a", 1), ("b", 3), ("c", 1)]);
}

#[test]
fn cursors_wrap_through_the_end_position() {
    let map = RBTreeMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);

    let mut cursor = map.cursor_end();
    assert!(cursor.is_end());
    assert_eq!(cursor.key_value(), None);
    cursor.move_next();
    assert_eq!(cursor, map.cursor_front());
    cursor.move_prev();
    assert!(cursor.is_end());
    cursor.move_prev();
    assert_eq!(cursor, map.cursor_back());
    assert_eq!(cursor.key(), Some(&3));

    assert!(map.find(&4).is_end());
    assert_eq!(map.find(&4), map.cursor_end());
}

#[test]
fn empty_map_cursors_stay_at_the_end() {
    let map: RBTreeMap<i32, i32> = RBTreeMap::new();
    let mut cursor = map.cursor_front();
    assert!(cursor.is_end());
    cursor.move_next();
    assert!(cursor.is_end());
    cursor.move_prev();
    assert!(cursor.is_end());
    assert_eq!(map.structure().to_string(), "N\n");
}

#[test]
fn bounds_on_the_ends() {
    let map = RBTreeMap::from([(10, ()), (20, ()), (30, ())]);
    assert_eq!(map.lower_bound(&5).key(), Some(&10));
    assert_eq!(map.lower_bound(&20).key(), Some(&20));
    assert_eq!(map.upper_bound(&20).key(), Some(&30));
    assert!(map.lower_bound(&31).is_end());
    assert!(map.upper_bound(&30).is_end());
}

#[test]
fn find_mut_edits_in_place() {
    let mut map = RBTreeMap::from([(1, 1), (2, 2)]);
    if let Some(v) = map.find_mut(&2).into_value_mut() {
        *v = 20;
    }
    assert!(map.find_mut(&3).into_value_mut().is_none());
    assert_eq!(map.values().copied().collect::<Vec<_>>(), [1, 20]);
}

#[test]
fn structure_of_a_small_map() {
    let map = RBTreeMap::from([(2, "b"), (1, "a"), (3, "c")]);
    let expected = "\
N
├──B:{2,b}
│   ├──R:{1,a}
│   │   ├──N
│   │   └──N
│   └──R:{3,c}
│       ├──N
│       └──N
";
    assert_eq!(map.structure().to_string(), expected);
}

#[test]
fn random_inserts_then_erases_stay_sorted() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut keys: Vec<u32> = Vec::with_capacity(1_000);
    while keys.len() < 1_000 {
        let key = rng.gen_range(0..1_000_000);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    let mut map = RBTreeMap::new();
    for &key in &keys {
        assert!(map.insert(key, key.to_string()).1);
    }
    assert_eq!(map.len(), 1_000);

    keys.shuffle(&mut rng);
    let (erased, kept) = keys.split_at(700);
    for key in erased {
        assert_eq!(map.remove(key), Some(key.to_string()));
    }

    let mut expected = kept.to_vec();
    expected.sort_unstable();
    assert_eq!(map.len(), 300);
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), expected);
    assert!(erased.iter().all(|key| !map.contains_key(key)));
}

#[test]
fn swap_and_clear() {
    let mut a = RBTreeMap::from([(1, 1)]);
    let mut b = RBTreeMap::from([(2, 2), (3, 3)]);
    a.swap(&mut b);
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 1);

    a.clear();
    assert!(a.is_empty());
    assert_eq!(a.first_key_value(), None);
    a.insert(7, 7);
    assert_eq!(a.last_key_value(), Some((&7, &7)));
}

#[test]
fn with_capacity_reserves_room() {
    let map: RBTreeMap<u8, u8> = RBTreeMap::with_capacity(64);
    assert!(map.capacity() >= 64);
    assert!(map.is_empty());
    assert!(RBTreeMap::<u8, u8>::max_len() >= 64);
}

#[test]
fn debug_lists_entries_in_order() {
    let map = RBTreeMap::from([(2, 'b'), (1, 'a')]);
    assert_eq!(format!("{map:?}"), "{1: 'a', 2: 'b'}");
}
