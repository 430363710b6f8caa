//! Bucket index over an `EntryList` plus the load-factor arithmetic that
//! decides when and how far it grows.
//!
//! Each slot records where its bucket's run starts in the entry list and how
//! many consecutive entries the run has. The index itself knows nothing
//! about contiguity; `Table` keeps the runs honest.

use crate::entry_list::NodeId;
use slotmap::Key;

/// Bucket count of a map built with `new()`.
pub const DEFAULT_BUCKET_COUNT: usize = 8;

/// Load factor above which a map grows, unless configured otherwise.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.75;

/// Largest bucket count whose slot array can be allocated.
pub const MAX_BUCKET_COUNT: usize = isize::MAX as usize / core::mem::size_of::<Bucket>();

/// One slot of the index: the head of a run and its length.
///
/// When `len == 0` the stored head is meaningless and is never followed.
#[derive(Copy, Clone, Debug)]
pub struct Bucket {
    first: NodeId,
    len: usize,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            first: NodeId::null(),
            len: 0,
        }
    }
}

impl Bucket {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Head of the run, if the run is non-empty.
    pub fn first(&self) -> Option<NodeId> {
        if self.len == 0 {
            None
        } else {
            Some(self.first)
        }
    }

    pub(crate) fn set_first(&mut self, id: NodeId) {
        self.first = id;
    }

    pub(crate) fn raw_first(&self) -> NodeId {
        self.first
    }

    pub(crate) fn grow(&mut self) {
        self.len += 1;
    }

    pub(crate) fn shrink(&mut self) {
        debug_assert!(self.len > 0, "shrinking an empty bucket");
        self.len -= 1;
    }
}

/// Fixed-size array of bucket slots. Replaced wholesale on rehash.
#[derive(Clone, Debug)]
pub struct BucketIndex {
    slots: Box<[Bucket]>,
}

impl BucketIndex {
    /// A zero request is clamped to one bucket.
    pub fn new(bucket_count: usize) -> Self {
        Self {
            slots: vec![Bucket::default(); bucket_count.max(1)].into_boxed_slice(),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn bucket_for(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    pub fn get(&self, bucket: usize) -> Option<&Bucket> {
        self.slots.get(bucket)
    }

    pub(crate) fn slot(&self, bucket: usize) -> &Bucket {
        &self.slots[bucket]
    }

    pub(crate) fn slot_mut(&mut self, bucket: usize) -> &mut Bucket {
        &mut self.slots[bucket]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> + '_ {
        self.slots.iter()
    }

    /// Sum of all run lengths.
    pub fn total_len(&self) -> usize {
        self.slots.iter().map(Bucket::len).sum()
    }
}

/// How far the bucket count jumps once the load factor is exceeded.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GrowthPolicy {
    /// `ceil(bucket_count * load_factor / max_load_factor * 2)`: restores the
    /// load factor and then leaves as much headroom again.
    #[default]
    Proportional,
    /// Double the bucket count until the load factor fits.
    Doubling,
}

impl GrowthPolicy {
    /// Bucket count to rehash into when `len` entries overflow `bucket_count`,
    /// or `None` if that count is above `MAX_BUCKET_COUNT`.
    pub fn target(self, bucket_count: usize, len: usize, max_load_factor: f32) -> Option<usize> {
        let bucket_count = bucket_count.max(1);
        match self {
            GrowthPolicy::Proportional => {
                let load = len as f64 / bucket_count as f64;
                let target =
                    checked_bucket_count(bucket_count as f64 * load / max_load_factor as f64 * 2.0)?
                        .max(bucket_count + 1);
                (target <= MAX_BUCKET_COUNT).then_some(target)
            }
            GrowthPolicy::Doubling => {
                let mut n = bucket_count;
                while exceeds(len, n, max_load_factor) {
                    n = n.checked_mul(2).filter(|&next| next <= MAX_BUCKET_COUNT)?;
                }
                Some(n)
            }
        }
    }
}

/// `count` rounded up, or `None` if it is not a bucket count we can allocate.
fn checked_bucket_count(count: f64) -> Option<usize> {
    let count = count.ceil();
    if count.is_finite() && count <= MAX_BUCKET_COUNT as f64 {
        Some(count as usize)
    } else {
        None
    }
}

/// Panic for a bucket count that cannot be allocated.
#[cold]
#[inline(never)]
pub(crate) fn capacity_overflow() -> ! {
    panic!("bucket count overflow")
}

pub fn load_factor(len: usize, bucket_count: usize) -> f32 {
    (len as f64 / bucket_count.max(1) as f64) as f32
}

/// True when `len` entries over `bucket_count` buckets is above the limit.
#[inline]
pub fn exceeds(len: usize, bucket_count: usize, max_load_factor: f32) -> bool {
    len as f64 > bucket_count as f64 * max_load_factor as f64
}

/// Smallest bucket count that holds `len` entries without exceeding the
/// limit, or `None` if no allocatable index is that large.
pub fn min_buckets_for(len: usize, max_load_factor: f32) -> Option<usize> {
    checked_bucket_count(len as f64 / max_load_factor as f64).map(|n| n.max(1))
}

/// Most entries `bucket_count` buckets hold before growth kicks in.
pub fn capacity_of(bucket_count: usize, max_load_factor: f32) -> usize {
    (bucket_count as f64 * max_load_factor as f64).floor() as usize
}

pub fn is_valid_max_load_factor(max_load_factor: f32) -> bool {
    max_load_factor.is_finite() && max_load_factor > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bucket_has_no_head() {
        let b = Bucket::default();
        assert!(b.is_empty());
        assert!(b.first().is_none());
    }

    #[test]
    fn zero_buckets_clamped() {
        let idx = BucketIndex::new(0);
        assert_eq!(idx.bucket_count(), 1);
        assert_eq!(idx.bucket_for(12345), 0);
    }

    #[test]
    fn bucket_for_is_hash_mod_count() {
        let idx = BucketIndex::new(8);
        assert_eq!(idx.bucket_for(0), 0);
        assert_eq!(idx.bucket_for(9), 1);
        assert_eq!(idx.bucket_for(u64::MAX), (u64::MAX % 8) as usize);
    }

    /// 6 of 8 sits exactly at 0.75 and does not trip; 7 does.
    #[test]
    fn exceeds_is_strict() {
        assert!(!exceeds(6, 8, 0.75));
        assert!(exceeds(7, 8, 0.75));
    }

    #[test]
    fn proportional_target_matches_formula() {
        // 8 * (7/8) / 0.75 * 2 = 18.67
        assert_eq!(GrowthPolicy::Proportional.target(8, 7, 0.75), Some(19));
        // 16 * (13/16) / 0.75 * 2 = 34.67
        assert_eq!(GrowthPolicy::Proportional.target(16, 13, 0.75), Some(35));
    }

    #[test]
    fn doubling_target_fits_load() {
        assert_eq!(GrowthPolicy::Doubling.target(8, 7, 0.75), Some(16));
        assert_eq!(GrowthPolicy::Doubling.target(8, 30, 0.75), Some(64));
        let n = GrowthPolicy::Doubling.target(1, 1000, 0.5).unwrap();
        assert!(!exceeds(1000, n, 0.5));
    }

    #[test]
    fn min_buckets_and_capacity() {
        assert_eq!(min_buckets_for(6, 0.75), Some(8));
        assert_eq!(min_buckets_for(7, 0.75), Some(10));
        assert_eq!(min_buckets_for(0, 0.75), Some(1));
        assert_eq!(capacity_of(8, 0.75), 6);
        assert_eq!(capacity_of(19, 0.75), 14);
    }

    /// A tiny load factor asks for more buckets than can exist.
    #[test]
    fn unallocatable_targets_are_none() {
        assert_eq!(min_buckets_for(1, 1e-30), None);
        assert_eq!(GrowthPolicy::Proportional.target(8, 1, 1e-30), None);
        assert_eq!(GrowthPolicy::Doubling.target(8, 1, 1e-30), None);
        assert_eq!(min_buckets_for(usize::MAX, 0.75), None);
        assert_eq!(
            GrowthPolicy::Proportional.target(MAX_BUCKET_COUNT, MAX_BUCKET_COUNT, 1.0),
            None
        );
    }

    #[test]
    fn invalid_load_factors_rejected() {
        assert!(is_valid_max_load_factor(0.5));
        assert!(!is_valid_max_load_factor(0.0));
        assert!(!is_valid_max_load_factor(-1.0));
        assert!(!is_valid_max_load_factor(f32::NAN));
        assert!(!is_valid_max_load_factor(f32::INFINITY));
    }
}
