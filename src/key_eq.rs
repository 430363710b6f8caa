//! Equality policy over keys.
//!
//! The map compares keys through a `KeyEq` value chosen at construction
//! instead of calling `Eq` directly. Whatever policy is used must agree with
//! the map's hasher: keys it deems equal have to hash the same.

/// Key equality predicate. `Q` is the type a lookup is phrased in; for
/// borrowed lookups it is the `Borrow` target of the stored key.
pub trait KeyEq<Q: ?Sized> {
    fn key_eq(&self, stored: &Q, query: &Q) -> bool;
}

/// Equality via `Eq`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DefaultEq;

impl<Q: ?Sized + Eq> KeyEq<Q> for DefaultEq {
    #[inline]
    fn key_eq(&self, stored: &Q, query: &Q) -> bool {
        stored == query
    }
}
