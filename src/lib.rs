//! unordered-map: a single-threaded hash map whose buckets are contiguous
//! runs of one doubly linked list of entries.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a node-based unordered map with stable entry handles and
//!   allocation-free rehashing, built in small layers whose invariants can be
//!   checked on their own.
//! - Layers:
//!   - EntryList<T>: arena-backed doubly linked list. Nodes can be
//!     allocated without linking, detached and relinked elsewhere, and keep
//!     their `NodeId` for as long as they live.
//!   - BucketIndex: one slot per bucket holding the head of its run and the
//!     run length. Also the home of the load-factor arithmetic and
//!     `GrowthPolicy`.
//!   - Table<K, V>: the list and the index kept in lockstep. Placement,
//!     unlinking, rehash and the invariant checker live here; nothing in
//!     this layer calls user code.
//!   - UnorderedMap<K, V, S, E>: public API. Owns the hasher `S`, the key
//!     equality policy `E`, the max load factor and the growth policy.
//!
//! Invariants
//! - Contiguity: every non-empty bucket's entries form one unbroken run of
//!   the list, starting at the bucket's recorded head.
//! - Completeness: the runs partition the list; there is no entry outside a
//!   run and no run outside the list.
//! - Count: map size, list length and the sum of run lengths agree.
//!
//! Placement
//! - An entry whose bucket is empty is pushed to the front of the list and
//!   becomes the run head.
//! - Otherwise it goes right after the current run head, so the head never
//!   changes on insert and no other run moves.
//! - Erasing a run head hands the head to its list successor.
//!
//! Growth
//! - Checked before an insert is placed, against the size after the insert:
//!   the map grows iff `len + 1 > bucket_count * max_load_factor`.
//! - `GrowthPolicy::Proportional` (default) picks
//!   `ceil(bucket_count * load / max_load_factor * 2)`;
//!   `GrowthPolicy::Doubling` doubles until the load fits.
//! - Rehash detaches and relinks every node in place. No entry is copied or
//!   reallocated, so handles survive; iteration order does not.
//!
//! Constraints
//! - Single-threaded: `!Sync` through the debug reentrancy tracker.
//! - Each entry stores its `u64` hash. `K: Hash` runs once per insert or
//!   lookup and never during rehash, erase or clone.
//! - Reentrancy: calling back into the same map from `Hash` or `KeyEq`
//!   panics in debug builds and is unsupported in release builds.
//!
//! Notes and non-goals
//! - Duplicate inserts keep the first value; there is no multimap mode.
//! - `insert`/`emplace` build the candidate entry before probing;
//!   `insert_with` is the lazy variant.
//! - Handles are not tied to a map instance. Using one with another map is
//!   a logic error that yields `None` or an unrelated entry, never UB.
//! - Iteration order is unspecified.

pub mod bucket_index;
pub mod config;
pub mod entry_list;
pub mod error;
pub mod iter;
pub mod key_eq;
mod reentrancy;
mod table;
mod unordered_map;
mod unordered_map_proptest;

// Public surface
pub use bucket_index::{
    GrowthPolicy, DEFAULT_BUCKET_COUNT, DEFAULT_MAX_LOAD_FACTOR, MAX_BUCKET_COUNT,
};
pub use config::MapConfig;
pub use error::{ConfigError, MapError};
pub use key_eq::{DefaultEq, KeyEq};
pub use unordered_map::{Handle, UnorderedMap};
