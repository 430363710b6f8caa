//! EntryList: arena-backed doubly linked list with stable node ids.
//!
//! Nodes live in a per-list `SlotMap`; links are `NodeId`s rather than
//! pointers. A node is allocated unlinked, can be linked at the front, the
//! back, or after any linked node, and can be extracted again without being
//! destroyed. Relinking never moves a node inside the arena, so a `NodeId`
//! keeps naming the same value until that node is erased.

use slotmap::{DefaultKey, SlotMap};

/// Identifier of a node inside one `EntryList` arena.
pub type NodeId = DefaultKey;

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

pub struct EntryList<T> {
    slots: SlotMap<NodeId, Node<T>>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> Default for EntryList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntryList<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of linked nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated nodes, linked or not.
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Reserve arena room for `additional` more nodes.
    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
    }

    pub fn first(&self) -> Option<NodeId> {
        self.head
    }

    pub fn last(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id).and_then(|n| n.next)
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id).and_then(|n| n.prev)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id).map(|n| &mut n.value)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(id)
    }

    /// True when `id` is allocated and currently part of the sequence.
    pub fn is_linked(&self, id: NodeId) -> bool {
        match self.slots.get(id) {
            Some(n) => n.prev.is_some() || self.head == Some(id),
            None => false,
        }
    }

    fn is_detached(&self, id: NodeId) -> bool {
        self.slots.contains_key(id) && !self.is_linked(id)
    }

    /// Allocate and construct a node without linking it.
    pub fn alloc(&mut self, value: T) -> NodeId {
        self.slots.insert(Node {
            value,
            prev: None,
            next: None,
        })
    }

    /// Destroy an unlinked node. Linked nodes must be extracted first.
    pub fn dealloc(&mut self, id: NodeId) -> Option<T> {
        if !self.is_detached(id) {
            return None;
        }
        self.slots.remove(id).map(|n| n.value)
    }

    fn connect(&mut self, left: Option<NodeId>, right: Option<NodeId>) {
        if let Some(l) = left {
            if let Some(n) = self.slots.get_mut(l) {
                n.next = right;
            }
        }
        if let Some(r) = right {
            if let Some(n) = self.slots.get_mut(r) {
                n.prev = left;
            }
        }
    }

    pub fn push_front(&mut self, id: NodeId) -> Option<NodeId> {
        if !self.is_detached(id) {
            return None;
        }
        let old_head = self.head;
        self.connect(Some(id), old_head);
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
        self.len += 1;
        Some(id)
    }

    pub fn push_back(&mut self, id: NodeId) -> Option<NodeId> {
        if !self.is_detached(id) {
            return None;
        }
        let old_tail = self.tail;
        self.connect(old_tail, Some(id));
        self.tail = Some(id);
        if self.head.is_none() {
            self.head = Some(id);
        }
        self.len += 1;
        Some(id)
    }

    /// Link `id` directly after `at`. If `at` is the tail, `id` becomes the tail.
    pub fn insert_after(&mut self, at: NodeId, id: NodeId) -> Option<NodeId> {
        if !self.is_detached(id) || !self.is_linked(at) {
            return None;
        }
        let after = self.next(at);
        self.connect(Some(id), after);
        self.connect(Some(at), Some(id));
        if self.tail == Some(at) {
            self.tail = Some(id);
        }
        self.len += 1;
        Some(id)
    }

    /// Unlink `id` from the sequence, leaving it allocated.
    pub fn extract(&mut self, id: NodeId) -> Option<NodeId> {
        if !self.is_linked(id) {
            return None;
        }
        let (prev, next) = {
            let n = &self.slots[id];
            (n.prev, n.next)
        };
        self.connect(prev, next);
        if self.head == Some(id) {
            self.head = next;
        }
        if self.tail == Some(id) {
            self.tail = prev;
        }
        let n = &mut self.slots[id];
        n.prev = None;
        n.next = None;
        self.len -= 1;
        Some(id)
    }

    /// Extract and destroy.
    pub fn erase(&mut self, id: NodeId) -> Option<T> {
        self.extract(id)?;
        self.slots.remove(id).map(|n| n.value)
    }

    /// Destroy every node, linked or not.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let mut nodes: Vec<_> = self
            .slots
            .iter_mut()
            .map(|(id, node)| (id, Some(node)))
            .collect();
        nodes.sort_unstable_by_key(|(id, _)| *id);
        IterMut {
            nodes,
            cursor: self.head,
            remaining: self.len,
        }
    }
}

impl<T: Clone> Clone for EntryList<T> {
    fn clone(&self) -> Self {
        let mut out = EntryList::with_capacity(self.len);
        for (_, value) in self.iter() {
            let id = out.alloc(value.clone());
            let _ = out.push_back(id);
        }
        out
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for EntryList<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter().map(|(_, v)| v)).finish()
    }
}

/// Front-to-back iterator over linked nodes.
pub struct Iter<'a, T> {
    slots: &'a SlotMap<NodeId, Node<T>>,
    cursor: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.slots.get(id)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some((id, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> core::iter::FusedIterator for Iter<'_, T> {}

/// Front-to-back iterator yielding mutable access to each linked node.
///
/// Every live node reference is taken up front from the arena, sorted by id,
/// so handing out `&mut T` for distinct ids needs no aliasing tricks.
pub struct IterMut<'a, T> {
    nodes: Vec<(NodeId, Option<&'a mut Node<T>>)>,
    cursor: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (NodeId, &'a mut T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let at = self.nodes.binary_search_by_key(&id, |(k, _)| *k).ok()?;
        let Node { value, next, .. } = self.nodes[at].1.take()?;
        self.cursor = *next;
        self.remaining -= 1;
        Some((id, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> core::iter::FusedIterator for IterMut<'_, T> {}

/// Owning front-to-back iterator. Unlinked nodes are dropped with the arena.
pub struct IntoIter<T> {
    slots: SlotMap<NodeId, Node<T>>,
    cursor: Option<NodeId>,
    remaining: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.slots.remove(id)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some(node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> IntoIterator for EntryList<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.slots,
            cursor: self.head,
            remaining: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &EntryList<i32>) -> Vec<i32> {
        list.iter().map(|(_, v)| *v).collect()
    }

    fn push_all(list: &mut EntryList<i32>, vals: &[i32]) -> Vec<NodeId> {
        vals.iter()
            .map(|&v| {
                let id = list.alloc(v);
                list.push_back(id).unwrap()
            })
            .collect()
    }

    #[test]
    fn push_front_and_back_order() {
        let mut l = EntryList::new();
        let b = l.alloc(2);
        l.push_back(b).unwrap();
        let a = l.alloc(1);
        l.push_front(a).unwrap();
        let c = l.alloc(3);
        l.push_back(c).unwrap();
        assert_eq!(values(&l), vec![1, 2, 3]);
        assert_eq!(l.first(), Some(a));
        assert_eq!(l.last(), Some(c));
        assert_eq!(l.len(), 3);
        assert_eq!(l.prev(b), Some(a));
        assert_eq!(l.next(b), Some(c));
    }

    /// Inserting after the tail moves the tail.
    #[test]
    fn insert_after_tail_updates_tail() {
        let mut l = EntryList::new();
        let ids = push_all(&mut l, &[1, 2]);
        let x = l.alloc(9);
        l.insert_after(ids[1], x).unwrap();
        assert_eq!(l.last(), Some(x));
        assert_eq!(values(&l), vec![1, 2, 9]);

        let y = l.alloc(5);
        l.insert_after(ids[0], y).unwrap();
        assert_eq!(values(&l), vec![1, 5, 2, 9]);
        assert_eq!(l.last(), Some(x));
    }

    #[test]
    fn insert_after_requires_linked_anchor() {
        let mut l = EntryList::new();
        let loose = l.alloc(1);
        let other = l.alloc(2);
        assert!(l.insert_after(loose, other).is_none());
        assert!(l.is_empty());
        assert_eq!(l.allocated(), 2);
    }

    /// Extracted nodes keep their value and id and can be relinked elsewhere.
    #[test]
    fn extract_keeps_node_alive_for_relink() {
        let mut l = EntryList::new();
        let ids = push_all(&mut l, &[1, 2, 3]);
        assert_eq!(l.extract(ids[0]), Some(ids[0]));
        assert_eq!(l.first(), Some(ids[1]));
        assert!(!l.is_linked(ids[0]));
        assert_eq!(l.get(ids[0]), Some(&1));

        l.insert_after(ids[2], ids[0]).unwrap();
        assert_eq!(values(&l), vec![2, 3, 1]);
        assert_eq!(l.last(), Some(ids[0]));
    }

    #[test]
    fn extract_only_node_empties_list() {
        let mut l = EntryList::new();
        let ids = push_all(&mut l, &[7]);
        l.extract(ids[0]).unwrap();
        assert!(l.first().is_none());
        assert!(l.last().is_none());
        assert!(l.is_empty());
        assert!(l.extract(ids[0]).is_none(), "double extract is a no-op");
        assert_eq!(l.dealloc(ids[0]), Some(7));
        assert_eq!(l.allocated(), 0);
    }

    #[test]
    fn erase_tail_and_middle() {
        let mut l = EntryList::new();
        let ids = push_all(&mut l, &[1, 2, 3, 4]);
        assert_eq!(l.erase(ids[3]), Some(4));
        assert_eq!(l.last(), Some(ids[2]));
        assert_eq!(l.erase(ids[1]), Some(2));
        assert_eq!(values(&l), vec![1, 3]);
        assert_eq!(l.erase(ids[1]), None, "stale id does not resolve");
        assert_eq!(l.len(), 2);
    }

    /// Linked nodes cannot be destroyed without being extracted first.
    #[test]
    fn dealloc_refuses_linked_node() {
        let mut l = EntryList::new();
        let ids = push_all(&mut l, &[1]);
        assert!(l.dealloc(ids[0]).is_none());
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn iter_mut_walks_list_order() {
        let mut l = EntryList::new();
        let ids = push_all(&mut l, &[1, 2, 3]);
        l.extract(ids[2]).unwrap();
        l.push_front(ids[2]).unwrap();
        let seen: Vec<i32> = l
            .iter_mut()
            .map(|(_, v)| {
                *v *= 10;
                *v
            })
            .collect();
        assert_eq!(seen, vec![30, 10, 20]);
        assert_eq!(l.iter().len(), 3);
    }

    /// Unlinked and recycled slots do not disturb the mutable walk.
    #[test]
    fn iter_mut_matches_iter_after_churn() {
        let mut l = EntryList::new();
        let ids = push_all(&mut l, &[1, 2, 3, 4, 5]);
        assert_eq!(l.erase(ids[1]), Some(2));
        l.extract(ids[4]).unwrap();
        let spare = l.alloc(9);
        let _ = l.insert_after(ids[0], ids[4]);
        let front = l.alloc(6);
        let _ = l.push_front(front);
        let order: Vec<NodeId> = l.iter().map(|(id, _)| id).collect();
        let walked: Vec<NodeId> = l.iter_mut().map(|(id, _)| id).collect();
        assert_eq!(walked, order);
        assert_eq!(l.iter_mut().len(), 5);
        assert!(!l.is_linked(spare));
        let values: Vec<i32> = l.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![6, 1, 5, 3, 4]);
    }

    #[test]
    fn clone_is_deep_and_preserves_order() {
        let mut l: EntryList<String> = EntryList::new();
        for s in ["a", "b", "c"] {
            let id = l.alloc(s.to_string());
            l.push_front(id).unwrap();
        }
        let loose = l.alloc("unlinked".to_string());
        let c = l.clone();
        let got: Vec<&str> = c.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(got, vec!["c", "b", "a"]);
        assert_eq!(c.allocated(), 3, "unlinked nodes are not copied");
        assert!(l.contains(loose));
    }

    #[test]
    fn into_iter_yields_list_order() {
        let mut l = EntryList::new();
        let ids = push_all(&mut l, &[1, 2, 3]);
        let x = l.alloc(0);
        l.push_front(x).unwrap();
        l.extract(ids[1]).unwrap();
        let all: Vec<i32> = l.into_iter().collect();
        assert_eq!(all, vec![0, 1, 3]);
    }
}
