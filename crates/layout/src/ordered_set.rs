//! Insertion-ordered hash set.
//!
//! A thin layer over [`IndexSet`] that adds Python-style set algebra and a
//! mutation stamp, so a detached [`Cursor`] can tell when the set changed
//! under it.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Bound, Index, RangeBounds,
    Sub, SubAssign,
};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::OrderedSetError;

#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Hash + Eq"))]
pub struct OrderedSet<T> {
    inner: IndexSet<T>,
    #[serde(skip)]
    stamp: u64,
}

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        Self {
            inner: IndexSet::default(),
            stamp: 0,
        }
    }
}

impl<T: Hash + Eq + Clone> OrderedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: IndexSet::with_capacity(capacity),
            stamp: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.inner.contains(value)
    }

    /// Append `value` unless present. Returns whether it was added.
    pub fn insert(&mut self, value: T) -> bool {
        let added = self.inner.insert(value);
        if added {
            self.touch();
        }
        added
    }

    /// Remove `value` if present, keeping the order of the rest.
    pub fn remove(&mut self, value: &T) -> bool {
        let removed = self.inner.shift_remove(value);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.touch();
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.inner.get_index(position)
    }

    pub fn first(&self) -> Option<&T> {
        self.inner.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.inner.last()
    }

    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.inner.get_index_of(value)
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.inner.iter()
    }

    /// Copy of the elements in `range`, clamped to the set's length.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        self.iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .cloned()
            .collect()
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        let item = self.inner.pop()?;
        self.touch();
        Some(item)
    }

    /// Remove and return the first element.
    pub fn pop_first(&mut self) -> Option<T> {
        let item = self.inner.shift_remove_index(0)?;
        self.touch();
        Some(item)
    }

    pub fn reverse(&mut self) {
        self.inner.reverse();
        self.touch();
    }

    pub fn retain<F: FnMut(&T) -> bool>(&mut self, keep: F) {
        self.inner.retain(keep);
        self.touch();
    }

    // ── Set algebra ──────────────────────────────────────────────

    /// Elements of `self` followed by the new elements of `other`.
    pub fn union(&self, other: &Self) -> Self {
        self.inner.union(&other.inner).cloned().collect()
    }

    pub fn intersection(&self, other: &Self) -> Self {
        self.inner.intersection(&other.inner).cloned().collect()
    }

    pub fn difference(&self, other: &Self) -> Self {
        self.inner.difference(&other.inner).cloned().collect()
    }

    /// `self - other` followed by `other - self`.
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        self.inner
            .symmetric_difference(&other.inner)
            .cloned()
            .collect()
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.inner.is_subset(&other.inner)
    }

    pub fn is_superset(&self, other: &Self) -> bool {
        self.inner.is_superset(&other.inner)
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.inner.is_disjoint(&other.inner)
    }

    pub fn union_update(&mut self, other: &Self) {
        self.extend(other.iter().cloned());
    }

    pub fn intersection_update(&mut self, other: &Self) {
        self.retain(|x| other.contains(x));
    }

    pub fn difference_update(&mut self, other: &Self) {
        self.retain(|x| !other.contains(x));
    }

    pub fn symmetric_difference_update(&mut self, other: &Self) {
        self.inner = self.symmetric_difference(other).inner;
        self.touch();
    }

    /// A detached cursor over the current contents.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            position: 0,
            stamp: self.stamp,
        }
    }

    fn touch(&mut self) {
        self.stamp = self.stamp.wrapping_add(1);
    }
}

/// Position in an [`OrderedSet`] that does not borrow it.
///
/// Advancing fails once the set has been mutated since the cursor was made.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    position: usize,
    stamp: u64,
}

impl Cursor {
    pub fn advance<'a, T>(
        &mut self,
        set: &'a OrderedSet<T>,
    ) -> Result<Option<&'a T>, OrderedSetError> {
        if set.stamp != self.stamp {
            return Err(OrderedSetError::ModifiedDuringIteration);
        }
        let item = set.inner.get_index(self.position);
        if item.is_some() {
            self.position += 1;
        }
        Ok(item)
    }
}

impl<T: fmt::Debug> fmt::Debug for OrderedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<&T> = self.inner.iter().collect();
        f.debug_tuple("OrderedSet").field(&items).finish()
    }
}

impl<T> Index<usize> for OrderedSet<T> {
    type Output = T;

    fn index(&self, position: usize) -> &T {
        &self.inner[position]
    }
}

// ── Equality ─────────────────────────────────────────────────────

// Order matters, unlike `IndexSet`'s own equality.
impl<T: PartialEq> PartialEq for OrderedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.iter().eq(other.inner.iter())
    }
}

impl<T: Eq> Eq for OrderedSet<T> {}

impl<T: PartialEq> PartialEq<[T]> for OrderedSet<T> {
    fn eq(&self, other: &[T]) -> bool {
        self.inner.iter().eq(other.iter())
    }
}

impl<T: PartialEq> PartialEq<Vec<T>> for OrderedSet<T> {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.inner.iter().eq(other.iter())
    }
}

impl<T: Hash + Eq> PartialEq<HashSet<T>> for OrderedSet<T> {
    fn eq(&self, other: &HashSet<T>) -> bool {
        self.inner.len() == other.len() && self.inner.iter().all(|x| other.contains(x))
    }
}

// ── Construction and iteration ───────────────────────────────────

impl<T: Hash + Eq + Clone> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T: Hash + Eq + Clone> Extend<T> for OrderedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T> IntoIterator for OrderedSet<T> {
    type Item = T;
    type IntoIter = indexmap::set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

// ── Operators ────────────────────────────────────────────────────

impl<T: Hash + Eq + Clone> BitOr for &OrderedSet<T> {
    type Output = OrderedSet<T>;

    fn bitor(self, rhs: Self) -> OrderedSet<T> {
        self.union(rhs)
    }
}

impl<T: Hash + Eq + Clone> BitAnd for &OrderedSet<T> {
    type Output = OrderedSet<T>;

    fn bitand(self, rhs: Self) -> OrderedSet<T> {
        self.intersection(rhs)
    }
}

impl<T: Hash + Eq + Clone> Sub for &OrderedSet<T> {
    type Output = OrderedSet<T>;

    fn sub(self, rhs: Self) -> OrderedSet<T> {
        self.difference(rhs)
    }
}

impl<T: Hash + Eq + Clone> BitXor for &OrderedSet<T> {
    type Output = OrderedSet<T>;

    fn bitxor(self, rhs: Self) -> OrderedSet<T> {
        self.symmetric_difference(rhs)
    }
}

impl<T: Hash + Eq + Clone> BitOrAssign<&OrderedSet<T>> for OrderedSet<T> {
    fn bitor_assign(&mut self, rhs: &OrderedSet<T>) {
        self.union_update(rhs);
    }
}

impl<T: Hash + Eq + Clone> BitAndAssign<&OrderedSet<T>> for OrderedSet<T> {
    fn bitand_assign(&mut self, rhs: &OrderedSet<T>) {
        self.intersection_update(rhs);
    }
}

impl<T: Hash + Eq + Clone> SubAssign<&OrderedSet<T>> for OrderedSet<T> {
    fn sub_assign(&mut self, rhs: &OrderedSet<T>) {
        self.difference_update(rhs);
    }
}

impl<T: Hash + Eq + Clone> BitXorAssign<&OrderedSet<T>> for OrderedSet<T> {
    fn bitxor_assign(&mut self, rhs: &OrderedSet<T>) {
        self.symmetric_difference_update(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[u32]) -> OrderedSet<u32> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_insert_keeps_first_position() {
        let mut s = set(&[3, 1, 2]);
        assert!(!s.insert(1));
        assert!(s.insert(7));
        assert_eq!(s, vec![3, 1, 2, 7]);
        assert_eq!(s.index_of(&7), Some(3));
    }

    #[test]
    fn test_remove_reindexes() {
        let mut s = set(&[5, 6, 7, 8]);
        assert!(s.remove(&6));
        assert!(!s.remove(&6));
        assert_eq!(s, vec![5, 7, 8]);
        assert_eq!(s.index_of(&8), Some(2));
        assert_eq!(s[1], 7);
    }

    #[test]
    fn test_pop_and_pop_first() {
        let mut s = set(&[1, 2, 3]);
        assert_eq!(s.pop(), Some(3));
        assert_eq!(s.pop_first(), Some(1));
        assert_eq!(s, vec![2]);
        assert_eq!(s.index_of(&2), Some(0));
        s.clear();
        assert_eq!(s.pop(), None);
        assert_eq!(s.pop_first(), None);
    }

    #[test]
    fn test_slice_clamps() {
        let s = set(&[0, 1, 2, 3, 4]);
        assert_eq!(s.slice(1..3), vec![1, 2]);
        assert_eq!(s.slice(3..), vec![3, 4]);
        assert_eq!(s.slice(..=1), vec![0, 1]);
        assert!(s.slice(4..2).is_empty());
        assert!(s.slice(9..).is_empty());
        assert_eq!(s.slice(2..99), vec![2, 3, 4]);
    }

    #[test]
    fn test_reverse() {
        let mut s = set(&[1, 2, 3]);
        s.reverse();
        assert_eq!(s, vec![3, 2, 1]);
        assert_eq!(s.index_of(&3), Some(0));
    }

    #[test]
    fn test_algebra_keeps_left_order() {
        let a = set(&[4, 1, 3]);
        let b = set(&[3, 5, 4]);
        assert_eq!(&a | &b, vec![4, 1, 3, 5]);
        assert_eq!(&a & &b, vec![4, 3]);
        assert_eq!(&a - &b, vec![1]);
        assert_eq!(&a ^ &b, vec![1, 5]);
        assert!(set(&[1, 4]).is_subset(&a));
        assert!(a.is_superset(&set(&[3])));
        assert!(a.is_disjoint(&set(&[9, 10])));
    }

    #[test]
    fn test_in_place_updates() {
        let mut a = set(&[1, 2, 3]);
        a |= &set(&[4]);
        a &= &set(&[4, 3, 2]);
        assert_eq!(a, vec![2, 3, 4]);
        a -= &set(&[3]);
        a ^= &set(&[4, 9]);
        assert_eq!(a, vec![2, 9]);
    }

    #[test]
    fn test_equality_flavours() {
        let s = set(&[2, 1]);
        assert_ne!(s, set(&[1, 2]));
        assert_eq!(s, [2u32, 1][..]);
        assert_eq!(s, HashSet::from([1, 2]));
        assert_ne!(s, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn test_cursor_detects_mutation() {
        let mut s = set(&[1, 2]);
        let mut cursor = s.cursor();
        assert_eq!(cursor.advance(&s), Ok(Some(&1)));
        s.insert(3);
        assert_eq!(
            cursor.advance(&s),
            Err(OrderedSetError::ModifiedDuringIteration)
        );

        let mut fresh = s.cursor();
        let mut seen = Vec::new();
        while let Some(&x) = fresh.advance(&s).unwrap() {
            seen.push(x);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_serde_as_sequence() {
        let s = set(&[3, 1, 2]);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "[3,1,2]");
        let back: OrderedSet<u32> = serde_json::from_str("[3,1,3,2]").unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_serde_skips_stamp() {
        let mut s = set(&[1, 2, 3]);
        s.remove(&2);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json, serde_json::json!([1, 3]));
        let back: OrderedSet<u32> = serde_json::from_value(json).unwrap();
        let mut cursor = back.cursor();
        assert_eq!(cursor.advance(&back), Ok(Some(&1)));
    }

    #[test]
    fn test_debug() {
        assert_eq!(format!("{:?}", set(&[1, 2])), "OrderedSet([1, 2])");
    }
}
