//! UnorderedMap: hashing, equality and load-factor policy on top of `Table`.

use crate::bucket_index::{
    capacity_of, capacity_overflow, exceeds, is_valid_max_load_factor, load_factor,
    min_buckets_for, GrowthPolicy, DEFAULT_BUCKET_COUNT, DEFAULT_MAX_LOAD_FACTOR,
};
use crate::config::MapConfig;
use crate::entry_list::NodeId;
use crate::error::{ConfigError, MapError};
use crate::iter::{Handles, IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::key_eq::{DefaultEq, KeyEq};
use crate::reentrancy::DebugReentrancy;
use crate::table::{Entry, Table};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::DefaultHashBuilder;

/// Stable position of one entry.
///
/// A handle keeps resolving to the same key/value pair across rehashes and
/// unrelated inserts or erases, and stops resolving once its entry is
/// erased. Handles are only meaningful for the map that returned them.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(NodeId);

impl Handle {
    pub(crate) fn new(id: NodeId) -> Self {
        Handle(id)
    }

    pub(crate) fn raw_handle(&self) -> NodeId {
        self.0
    }

    pub fn key<'a, K, V, S, E>(&self, map: &'a UnorderedMap<K, V, S, E>) -> Option<&'a K> {
        map.handle_entry(*self).map(|e| &e.key)
    }

    pub fn value<'a, K, V, S, E>(&self, map: &'a UnorderedMap<K, V, S, E>) -> Option<&'a V> {
        map.handle_entry(*self).map(|e| &e.value)
    }

    pub fn value_mut<'a, K, V, S, E>(
        &self,
        map: &'a mut UnorderedMap<K, V, S, E>,
    ) -> Option<&'a mut V> {
        map.handle_value_mut(*self)
    }

    /// The entry after this one in iteration order.
    pub fn next<K, V, S, E>(&self, map: &UnorderedMap<K, V, S, E>) -> Option<Handle> {
        map.next_handle(*self)
    }
}

/// Unordered map whose buckets are contiguous runs of a single entry list.
///
/// `S` hashes keys, `E` compares them. Iteration follows the entry list;
/// the order is unspecified and changes on rehash.
pub struct UnorderedMap<K, V, S = DefaultHashBuilder, E = DefaultEq> {
    hasher: S,
    key_eq: E,
    table: Table<K, V>,
    max_load_factor: f32,
    growth: GrowthPolicy,
    reentrancy: DebugReentrancy,
}

impl<K, V> UnorderedMap<K, V> {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKET_COUNT)
    }

    /// A bucket count of 0 is treated as 1.
    pub fn with_buckets(bucket_count: usize) -> Self {
        Self::with_policies(bucket_count, DefaultHashBuilder::default(), DefaultEq)
    }

    pub fn with_config(config: MapConfig) -> Result<Self, ConfigError> {
        Self::with_config_and_policies(config, DefaultHashBuilder::default(), DefaultEq)
    }
}

impl<K, V> Default for UnorderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> UnorderedMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_policies(DEFAULT_BUCKET_COUNT, hasher, DefaultEq)
    }

    pub fn with_buckets_and_hasher(bucket_count: usize, hasher: S) -> Self {
        Self::with_policies(bucket_count, hasher, DefaultEq)
    }
}

impl<K, V, S, E> UnorderedMap<K, V, S, E> {
    /// Fully explicit constructor. A bucket count of 0 is treated as 1.
    pub fn with_policies(bucket_count: usize, hasher: S, key_eq: E) -> Self {
        Self {
            hasher,
            key_eq,
            table: Table::new(bucket_count),
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            growth: GrowthPolicy::default(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn with_config_and_policies(
        config: MapConfig,
        hasher: S,
        key_eq: E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut map = Self::with_policies(config.bucket_count, hasher, key_eq);
        map.max_load_factor = config.max_load_factor;
        map.growth = config.growth;
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Number of entries in bucket `bucket`, or `None` if out of range.
    pub fn bucket_size(&self, bucket: usize) -> Option<usize> {
        self.table.buckets().get(bucket).map(|b| b.len())
    }

    pub fn load_factor(&self) -> f32 {
        load_factor(self.table.len(), self.table.bucket_count())
    }

    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Entries the current buckets hold before the next automatic growth.
    pub fn max_size(&self) -> usize {
        capacity_of(self.table.bucket_count(), self.max_load_factor)
    }

    pub fn growth_policy(&self) -> GrowthPolicy {
        self.growth
    }

    pub fn set_growth_policy(&mut self, growth: GrowthPolicy) {
        self.growth = growth;
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn key_eq(&self) -> &E {
        &self.key_eq
    }

    /// Change the growth threshold. If the map is already above it, it is
    /// rehashed right away.
    ///
    /// A limit so small that the index could not hold even one more entry is
    /// rejected, and the map is left unchanged.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) -> Result<(), ConfigError> {
        let _g = self.reentrancy.enter("set_max_load_factor");
        if !is_valid_max_load_factor(max_load_factor) {
            return Err(ConfigError::InvalidMaxLoadFactor(max_load_factor));
        }
        let (len, count) = (self.table.len(), self.table.bucket_count());
        let too_small = ConfigError::LoadFactorTooSmall(max_load_factor);
        min_buckets_for(len.saturating_add(1), max_load_factor).ok_or(too_small)?;
        let target = if exceeds(len, count, max_load_factor) {
            Some(
                self.growth
                    .target(count, len, max_load_factor)
                    .ok_or(too_small)?,
            )
        } else {
            None
        };
        self.max_load_factor = max_load_factor;
        if let Some(target) = target {
            self.table.rehash(target);
        }
        Ok(())
    }

    /// Rebuild the index with at least `bucket_count` buckets; never fewer
    /// than the current entries need. May shrink.
    pub fn rehash(&mut self, bucket_count: usize) {
        let _g = self.reentrancy.enter("rehash");
        let needed = match min_buckets_for(self.table.len(), self.max_load_factor) {
            Some(needed) => needed,
            None => capacity_overflow(),
        };
        self.table.rehash(bucket_count.max(needed));
    }

    /// Size the index so `count` entries in total fit without growth.
    ///
    /// # Panics
    ///
    /// Panics if that many entries need more than `MAX_BUCKET_COUNT` buckets.
    pub fn reserve(&mut self, count: usize) {
        let _g = self.reentrancy.enter("reserve");
        let target = match min_buckets_for(count.max(self.table.len()), self.max_load_factor) {
            Some(target) => target,
            None => capacity_overflow(),
        };
        self.table
            .reserve_entries(count.saturating_sub(self.table.len()));
        self.table.rehash(target);
    }

    /// Drop every entry; the bucket count is kept.
    pub fn clear(&mut self) {
        let old = {
            let _g = self.reentrancy.enter("clear");
            self.table.clear()
        };
        // Entries drop outside the guard so their `Drop` may use the map.
        drop(old);
    }

    pub fn first(&self) -> Option<Handle> {
        self.table.entries().first().map(Handle::new)
    }

    fn next_handle(&self, h: Handle) -> Option<Handle> {
        if !self.table.is_live(h.raw_handle()) {
            return None;
        }
        self.table.entries().next(h.raw_handle()).map(Handle::new)
    }

    fn handle_entry(&self, h: Handle) -> Option<&Entry<K, V>> {
        let id = h.raw_handle();
        if !self.table.is_live(id) {
            return None;
        }
        self.table.entry(id)
    }

    fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        let id = h.raw_handle();
        if !self.table.is_live(id) {
            return None;
        }
        self.table.entry_mut(id).map(|e| &mut e.value)
    }

    /// Remove the entry at `handle`. A stale handle is a no-op.
    pub fn erase(&mut self, handle: Handle) -> Option<(K, V)> {
        let _g = self.reentrancy.enter("erase");
        self.table
            .unlink(handle.raw_handle())
            .map(|e| (e.key, e.value))
    }

    /// Erase from `first` up to, not including, `last` (`None` = to the end).
    /// Returns how many entries were erased.
    ///
    /// A stale `first` or a stale `last` erases nothing.
    pub fn erase_range(&mut self, first: Handle, last: Option<Handle>) -> usize {
        let stop = last.map(|h| h.raw_handle());
        let mut cursor = Some(first.raw_handle());
        let mut erased = 0;
        while let Some(id) = cursor {
            let removed = {
                let _g = self.reentrancy.enter("erase_range");
                if Some(id) == stop
                    || !self.table.is_live(id)
                    || stop.map_or(false, |s| !self.table.is_live(s))
                {
                    break;
                }
                cursor = self.table.entries().next(id);
                self.table.unlink(id)
            };
            if removed.is_some() {
                erased += 1;
            }
            // Dropped between steps, with the guard released.
            drop(removed);
        }
        erased
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.table.entries().iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.table.entries_mut().iter_mut(),
        }
    }

    pub fn handles(&self) -> Handles<'_, K, V> {
        Handles {
            it: self.table.entries().iter(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Assert the bucket/list invariants, panicking on the first violation.
    #[doc(hidden)]
    pub fn debug_validate(&self) {
        self.table.validate();
    }
}

impl<K, V, S, E> UnorderedMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn lookup<Q>(&self, q: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let hash = self.make_hash(q);
        self.table.find(hash, |stored| {
            self.key_eq.key_eq(<K as Borrow<Q>>::borrow(stored), q)
        })
    }

    /// Bucket that `q` maps to under the current bucket count.
    pub fn bucket<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        self.table.buckets().bucket_for(self.make_hash(q))
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter("find");
        self.lookup(q).map(Handle::new)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter("contains_key");
        self.lookup(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter("get");
        let id = self.lookup(q)?;
        self.table.entry(id).map(|e| &e.value)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter("get_key_value");
        let id = self.lookup(q)?;
        self.table.entry(id).map(|e| (&e.key, &e.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let _g = self.reentrancy.enter("get_mut");
        let id = self.lookup(q)?;
        self.table.entry_mut(id).map(|e| &mut e.value)
    }

    /// Like `get`, but a miss is an error.
    pub fn at<Q>(&self, q: &Q) -> Result<&V, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.get(q).ok_or(MapError::KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.get_mut(q).ok_or(MapError::KeyNotFound)
    }

    /// Find `q` and erase it.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let removed = {
            let _g = self.reentrancy.enter("remove");
            let id = self.lookup(q)?;
            self.table.unlink(id)?
        };
        Some(removed.value)
    }
}

impl<K, V, S, E> UnorderedMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Construct the entry from `make`, then insert it unless its key is
    /// already present.
    ///
    /// `make` always runs and the candidate entry is always built, even
    /// when it turns out to be a duplicate; the candidate is then dropped and
    /// the existing entry is returned with `false`.
    pub fn emplace<F>(&mut self, make: F) -> (Handle, bool)
    where
        F: FnOnce() -> (K, V),
    {
        let (key, value) = make();
        let (handle, inserted, rejected) = {
            let _g = self.reentrancy.enter("emplace");
            let hash = self.make_hash(&key);
            let candidate = self.table.alloc(Entry { key, value, hash });
            let existing = match self.table.entry(candidate) {
                Some(c) => self
                    .table
                    .find(hash, |stored| self.key_eq.key_eq(stored, &c.key)),
                None => None,
            };
            match existing {
                Some(id) => (id, false, self.table.discard(candidate)),
                None => {
                    let id = self
                        .table
                        .link_grown(candidate, self.max_load_factor, self.growth);
                    (id, true, None)
                }
            }
        };
        // A rejected candidate drops only after the guard is released.
        drop(rejected);
        (Handle::new(handle), inserted)
    }

    /// Insert `key -> value` unless `key` is present. The existing value is
    /// left untouched on a duplicate.
    pub fn insert(&mut self, key: K, value: V) -> (Handle, bool) {
        self.emplace(move || (key, value))
    }

    /// Like `insert`, but `default` only runs when `key` is absent.
    pub fn insert_with<F>(&mut self, key: K, default: F) -> (Handle, bool)
    where
        F: FnOnce() -> V,
    {
        let _g = self.reentrancy.enter("insert_with");
        let hash = self.make_hash(&key);
        if let Some(id) = self
            .table
            .find(hash, |stored| self.key_eq.key_eq(stored, &key))
        {
            return (Handle::new(id), false);
        }
        let value = default();
        let candidate = self.table.alloc(Entry { key, value, hash });
        let id = self
            .table
            .link_grown(candidate, self.max_load_factor, self.growth);
        (Handle::new(id), true)
    }

    /// Value for `key`, inserting `default()` first if it is absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let (h, _) = self.insert_with(key, default);
        match self.table.entry_mut(h.raw_handle()) {
            Some(e) => &mut e.value,
            None => unreachable!("handle returned by insert_with is live"),
        }
    }

    /// Value for `key`, inserting `V::default()` first if it is absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }
}

impl<K, V, S, E> Clone for UnorderedMap<K, V, S, E>
where
    K: Clone,
    V: Clone,
    S: Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            key_eq: self.key_eq.clone(),
            table: self.table.clone(),
            max_load_factor: self.max_load_factor,
            growth: self.growth,
            reentrancy: DebugReentrancy::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S, E> fmt::Debug for UnorderedMap<K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, E> PartialEq for UnorderedMap<K, V, S, E>
where
    K: Hash,
    V: PartialEq,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| *v == *ov))
    }
}

impl<K, V, S, E> Eq for UnorderedMap<K, V, S, E>
where
    K: Hash,
    V: Eq,
    S: BuildHasher,
    E: KeyEq<K>,
{
}

/// Bulk insert; the first occurrence of a key wins.
impl<K, V, S, E> Extend<(K, V)> for UnorderedMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S, E> FromIterator<(K, V)> for UnorderedMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher + Default,
    E: KeyEq<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_policies(DEFAULT_BUCKET_COUNT, S::default(), E::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S, E> IntoIterator for UnorderedMap<K, V, S, E> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            it: self.table.into_entries().into_iter(),
        }
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a UnorderedMap<K, V, S, E> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a mut UnorderedMap<K, V, S, E> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
