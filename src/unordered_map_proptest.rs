#![cfg(test)]

// Property tests for UnorderedMap kept inside the crate so they can reach
// the structural validator without a public test hook.

use crate::{GrowthPolicy, Handle, MapError, UnorderedMap};
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink to earlier keys and op lists
// shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    GetOrDefault(usize),
    EraseHandle(usize),
    Remove(usize),
    EraseRange(usize, usize),
    Find(usize),
    Contains(String),
    At(usize),
    Mutate(usize, i32),
    Rehash(usize),
    Reserve(usize),
    Iterate,
    CloneCheck,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            1 => idx.clone().prop_map(OpI::GetOrDefault),
            2 => idx.clone().prop_map(OpI::EraseHandle),
            1 => idx.clone().prop_map(OpI::Remove),
            1 => (0usize..8, 0usize..4).prop_map(|(s, n)| OpI::EraseRange(s, n)),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => idx.clone().prop_map(OpI::At),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => (0usize..64).prop_map(OpI::Rehash),
            1 => (0usize..64).prop_map(OpI::Reserve),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::CloneCheck),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Applies one op to both the map and a std HashMap model, checking parity
// and the structural invariants after every step.
fn run_scenario<S>(
    mut sut: UnorderedMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();
    let default_calls = Rc::new(Cell::new(0));

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let (h, fresh) = sut.insert(k.clone(), v);
                prop_assert_eq!(fresh, !already, "insert reports novelty");
                if fresh {
                    live.insert(k.clone(), h);
                    model.insert(k, v);
                } else {
                    prop_assert_eq!(Some(&h), live.get(&k), "duplicate returns existing");
                }
            }
            OpI::InsertWith(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let counter = default_calls.clone();
                let before = counter.get();
                let (h, fresh) = sut.insert_with(k.clone(), move || {
                    counter.set(counter.get() + 1);
                    v
                });
                prop_assert_eq!(fresh, !already);
                if fresh {
                    prop_assert_eq!(default_calls.get(), before + 1);
                    live.insert(k.clone(), h);
                    model.insert(k, v);
                } else {
                    prop_assert_eq!(default_calls.get(), before, "default must not run on duplicate");
                }
            }
            OpI::GetOrDefault(i) => {
                let k = key_from(pool, i);
                let got = *sut.get_or_insert_default(k.clone());
                let expected = *model.entry(k.clone()).or_default();
                prop_assert_eq!(got, expected);
                if !live.contains_key(&k) {
                    let h = sut.find(&k);
                    prop_assert!(h.is_some());
                    if let Some(h) = h {
                        live.insert(k, h);
                    }
                }
            }
            OpI::EraseHandle(i) => {
                let k = key_from(pool, i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.erase(h).expect("live handle erases");
                    prop_assert!(kk == k);
                    prop_assert_eq!(Some(vv), model.remove(&kk));
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(&k).is_none());
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(k.0.as_str()), model.remove(&k));
                if let Some(h) = live.remove(&k) {
                    stale.push(h);
                }
            }
            OpI::EraseRange(start, n) => {
                let hs: Vec<Handle> = sut.handles().collect();
                if start < hs.len() {
                    let end = start + n;
                    let last = hs.get(end).copied();
                    let gone: Vec<Handle> = hs[start..end.min(hs.len())].to_vec();
                    let erased = sut.erase_range(hs[start], last);
                    prop_assert_eq!(erased, gone.len());
                    for h in gone {
                        let key = live
                            .iter()
                            .find(|(_, lh)| **lh == h)
                            .map(|(k, _)| k.clone())
                            .expect("handle tracked");
                        live.remove(&key);
                        model.remove(&key);
                        stale.push(h);
                    }
                }
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                let s = sut.find(&k);
                prop_assert_eq!(s.is_some(), model.contains_key(&k));
                if let Some(h) = s {
                    prop_assert_eq!(Some(&h), live.get(&k), "handle is stable");
                }
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::At(i) => {
                let k = key_from(pool, i);
                match model.get(&k) {
                    Some(v) => {
                        prop_assert_eq!(sut.at(&k), Ok(v));
                    }
                    None => {
                        prop_assert_eq!(sut.at(&k), Err(MapError::KeyNotFound));
                    }
                }
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(&h) = live.get(&k) {
                    let vr = h.value_mut(&mut sut);
                    prop_assert!(vr.is_some(), "live handle should resolve");
                    if let Some(vr) = vr {
                        *vr = vr.saturating_add(d);
                    }
                    if let Some(mv) = model.get_mut(&k) {
                        *mv = mv.saturating_add(d);
                    }
                }
            }
            OpI::Rehash(n) => {
                sut.rehash(n);
                prop_assert!(sut.bucket_count() >= n.max(1));
                prop_assert!(sut.load_factor() <= sut.max_load_factor());
            }
            OpI::Reserve(n) => {
                sut.reserve(n);
                prop_assert!(sut.max_size() >= n, "reserve leaves room for {} entries", n);
                prop_assert!(sut.load_factor() <= sut.max_load_factor());
            }
            OpI::Iterate => {
                prop_assert_eq!(sut.iter().count(), sut.len());
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
            OpI::CloneCheck => {
                let c = sut.clone();
                c.debug_validate();
                prop_assert!(c == sut);
                let a: Vec<_> = c.iter().collect();
                let b: Vec<_> = sut.iter().collect();
                prop_assert_eq!(a, b);
            }
        }

        sut.debug_validate();
        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        for (k, &h) in &live {
            prop_assert_eq!(h.key(&sut), Some(k));
            prop_assert_eq!(h.value(&sut), model.get(k));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// - Duplicate inserts report `false` and hand back the existing handle.
// - `find`/`contains_key`/`at` parity; handles stay stable across growth and rehash.
// - Erased handles never resolve again.
// - Bucket runs stay contiguous and their lengths add up after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(UnorderedMap::new(), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_doubling((pool, ops) in arb_scenario()) {
        let mut sut = UnorderedMap::with_buckets(1);
        sut.set_growth_policy(GrowthPolicy::Doubling);
        run_scenario(sut, &pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key shares one run.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Few distinct hashes: many runs of several entries side by side.
#[derive(Clone, Default)]
struct CoarseBuildHasher;
struct CoarseHasher(u64);
impl BuildHasher for CoarseBuildHasher {
    type Hasher = CoarseHasher;
    fn build_hasher(&self) -> Self::Hasher {
        CoarseHasher(0)
    }
}
impl Hasher for CoarseHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = self.0.wrapping_add(bytes.len() as u64);
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(UnorderedMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_coarse_hash((pool, ops) in arb_scenario()) {
        run_scenario(UnorderedMap::with_buckets_and_hasher(3, CoarseBuildHasher), &pool, ops)?;
    }
}

// Property: a rehash to any count preserves contents and every handle.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_rehash_preserves_entries(
        keys in proptest::collection::btree_set(any::<u16>(), 0..60),
        target in 0usize..200,
    ) {
        let mut m: UnorderedMap<u16, u32> = UnorderedMap::new();
        let hs: Vec<(u16, Handle)> = keys.iter().map(|&k| (k, m.insert(k, k as u32 * 3).0)).collect();
        m.rehash(target);
        m.debug_validate();
        prop_assert_eq!(m.len(), keys.len());
        for (k, h) in hs {
            prop_assert_eq!(h.key(&m), Some(&k));
            prop_assert_eq!(m.get(&k), Some(&(k as u32 * 3)));
        }
    }
}
