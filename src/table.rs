//! Table: the entry list and the bucket index kept in lockstep.
//!
//! Invariants
//! - Contiguity: the entries of a non-empty bucket are exactly the `len`
//!   entries reached by following `next` from its `first`.
//! - Completeness: the runs partition the whole list.
//! - Count: `size == list length == sum of run lengths`.
//!
//! Placement keeps runs contiguous without touching other buckets: a new
//! entry of an empty bucket goes to the front of the list, any other entry
//! goes right after its run's head. Entries carry their hash, so nothing in
//! here calls user code.

use crate::bucket_index::{capacity_overflow, exceeds, BucketIndex, GrowthPolicy};
use crate::entry_list::{EntryList, NodeId};
use slotmap::Key;

#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
}

pub(crate) struct Table<K, V> {
    entries: EntryList<Entry<K, V>>,
    buckets: BucketIndex,
    size: usize,
}

impl<K, V> Table<K, V> {
    pub(crate) fn new(bucket_count: usize) -> Self {
        Self {
            entries: EntryList::new(),
            buckets: BucketIndex::new(bucket_count),
            size: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.bucket_count()
    }

    pub(crate) fn buckets(&self) -> &BucketIndex {
        &self.buckets
    }

    pub(crate) fn entries(&self) -> &EntryList<Entry<K, V>> {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut EntryList<Entry<K, V>> {
        &mut self.entries
    }

    pub(crate) fn into_entries(self) -> EntryList<Entry<K, V>> {
        self.entries
    }

    pub(crate) fn entry(&self, id: NodeId) -> Option<&Entry<K, V>> {
        self.entries.get(id)
    }

    pub(crate) fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry<K, V>> {
        self.entries.get_mut(id)
    }

    /// A handle is live if it names an entry that is linked into the list.
    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        self.entries.is_linked(id)
    }

    pub(crate) fn reserve_entries(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    /// Walk the run of `hash`'s bucket, at most `len` entries.
    pub(crate) fn find<F>(&self, hash: u64, mut is_match: F) -> Option<NodeId>
    where
        F: FnMut(&K) -> bool,
    {
        let b = self.buckets.bucket_for(hash);
        let slot = self.buckets.slot(b);
        let mut cursor = slot.first();
        for _ in 0..slot.len() {
            let id = cursor?;
            let e = self.entries.get(id)?;
            if is_match(&e.key) {
                return Some(id);
            }
            cursor = self.entries.next(id);
        }
        None
    }

    /// Allocate a candidate entry that is not yet part of any run.
    pub(crate) fn alloc(&mut self, entry: Entry<K, V>) -> NodeId {
        self.entries.alloc(entry)
    }

    /// Destroy a candidate that lost to an existing key.
    pub(crate) fn discard(&mut self, id: NodeId) -> Option<Entry<K, V>> {
        self.entries.dealloc(id)
    }

    /// Link a unique candidate, growing first if it would push the load
    /// factor over `max_load_factor`.
    ///
    /// Panics if the grown index would exceed `MAX_BUCKET_COUNT`.
    pub(crate) fn link_grown(
        &mut self,
        id: NodeId,
        max_load_factor: f32,
        growth: GrowthPolicy,
    ) -> NodeId {
        let prospective = self.size + 1;
        let count = self.bucket_count();
        if exceeds(prospective, count, max_load_factor) {
            let target = match growth.target(count, prospective, max_load_factor) {
                Some(target) => target,
                None => capacity_overflow(),
            };
            log::trace!(
                "load factor {:.3} over {:.3} at {} entries; growing {} -> {} buckets",
                prospective as f64 / count as f64,
                max_load_factor,
                prospective,
                count,
                target
            );
            self.rehash(target);
        }
        Self::place(&mut self.entries, &mut self.buckets, id);
        self.size += 1;
        id
    }

    fn place(entries: &mut EntryList<Entry<K, V>>, buckets: &mut BucketIndex, id: NodeId) {
        let hash = match entries.get(id) {
            Some(e) => e.hash,
            None => return,
        };
        let b = buckets.bucket_for(hash);
        let slot = buckets.slot_mut(b);
        match slot.first() {
            Some(head) => {
                let linked = entries.insert_after(head, id);
                debug_assert!(linked.is_some(), "run head must be linked");
            }
            None => {
                let linked = entries.push_front(id);
                debug_assert!(linked.is_some(), "candidate must be unlinked");
                slot.set_first(id);
            }
        }
        slot.grow();
    }

    /// Remove a linked entry, keeping its run's head valid.
    pub(crate) fn unlink(&mut self, id: NodeId) -> Option<Entry<K, V>> {
        if !self.entries.is_linked(id) {
            return None;
        }
        let hash = self.entries.get(id)?.hash;
        let next = self.entries.next(id);
        let b = self.buckets.bucket_for(hash);
        let slot = self.buckets.slot_mut(b);
        slot.shrink();
        if slot.raw_first() == id {
            // The successor still belongs to this run unless the run is now empty.
            slot.set_first(next.unwrap_or_else(NodeId::null));
        }
        self.size -= 1;
        self.entries.erase(id)
    }

    /// Rebuild the index with `bucket_count` buckets by relinking every
    /// entry. Entry ids survive; list order does not.
    pub(crate) fn rehash(&mut self, bucket_count: usize) {
        let mut buckets = BucketIndex::new(bucket_count);
        log::debug!(
            "rehash: {} -> {} buckets ({} entries)",
            self.buckets.bucket_count(),
            buckets.bucket_count(),
            self.size
        );
        // Relinked entries collect in front of `cursor`; the unvisited rest
        // stays behind it, so the walk never revisits a node.
        let mut cursor = self.entries.first();
        while let Some(id) = cursor {
            cursor = self.entries.next(id);
            let _ = self.entries.extract(id);
            Self::place(&mut self.entries, &mut buckets, id);
        }
        self.buckets = buckets;
    }

    /// Recompute every slot from the current list order. Used after the list
    /// was deep-copied, where runs are already contiguous.
    fn rebuild_index(&mut self) {
        let mut buckets = BucketIndex::new(self.buckets.bucket_count());
        for (id, e) in self.entries.iter() {
            let b = buckets.bucket_for(e.hash);
            let slot = buckets.slot_mut(b);
            if slot.is_empty() {
                slot.set_first(id);
            }
            slot.grow();
        }
        self.buckets = buckets;
        self.size = self.entries.len();
    }

    /// Empty the table, keeping the bucket count. The old entries are handed
    /// back so the caller decides when they drop.
    pub(crate) fn clear(&mut self) -> EntryList<Entry<K, V>> {
        self.buckets = BucketIndex::new(self.buckets.bucket_count());
        self.size = 0;
        core::mem::take(&mut self.entries)
    }

    /// Panic with a description of the first broken invariant.
    pub(crate) fn validate(&self) {
        let count = self.buckets.bucket_count();
        let mut seen = vec![0usize; count];
        let mut closed = vec![false; count];
        let mut current: Option<usize> = None;
        let mut walked = 0usize;
        let mut prev: Option<NodeId> = None;

        for (id, e) in self.entries.iter() {
            walked += 1;
            assert_eq!(self.entries.prev(id), prev, "broken prev link");
            prev = Some(id);

            let b = self.buckets.bucket_for(e.hash);
            if current != Some(b) {
                if let Some(c) = current {
                    closed[c] = true;
                }
                assert!(!closed[b], "bucket {b} is split into several runs");
                assert_eq!(
                    self.buckets.slot(b).first(),
                    Some(id),
                    "bucket {b} head is not the start of its run"
                );
                current = Some(b);
            }
            seen[b] += 1;
        }
        assert_eq!(self.entries.last(), prev, "tail does not end the walk");

        for (b, (slot, n)) in self.buckets.iter().zip(&seen).enumerate() {
            assert_eq!(slot.len(), *n, "bucket {b} length disagrees with its run");
        }
        assert_eq!(walked, self.entries.len(), "list length disagrees with walk");
        assert_eq!(walked, self.size, "size disagrees with list length");
        assert_eq!(self.buckets.total_len(), self.size, "runs do not cover the list");
    }
}

impl<K: Clone, V: Clone> Clone for Table<K, V> {
    fn clone(&self) -> Self {
        let mut out = Table {
            entries: self.entries.clone(),
            buckets: BucketIndex::new(self.buckets.bucket_count()),
            size: 0,
        };
        out.rebuild_index();
        out
    }
}
