//! The sorted-container + cached-iterator primitive shared by state- and
//! command-slices (section 4.4.1).
//!
//! Samples are inserted in any order and kept time-sorted; lookups remember
//! the index of the last resolved position and try a small neighbor window
//! before falling back to binary search, since consecutive `update(t)` calls
//! with monotonically increasing `t` (the overwhelmingly common case, per
//! the per-frame coordinator) land near the previous result.

use std::cell::Cell;

use crate::consts::CACHED_ITER_NEIGHBOR_WINDOW;
use crate::timestamp::Timestamp;

/// Anything that can be placed in a [`SortedSamples`] container.
pub trait Timestamped {
    fn time(&self) -> Timestamp;
}

/// A time-sorted `Vec<T>` with a cached search hint.
#[derive(Debug)]
pub struct SortedSamples<T: Timestamped> {
    items: Vec<T>,
    /// Index most recently returned by a bound lookup; used as the starting
    /// point for the next lookup's neighbor search.
    cache_hint: Cell<usize>,
}

impl<T: Timestamped> SortedSamples<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cache_hint: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn first_time(&self) -> Option<Timestamp> {
        self.first().map(Timestamped::time)
    }

    pub fn last_time(&self) -> Option<Timestamp> {
        self.last().map(Timestamped::time)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Inserts `item`, re-sorting as needed to keep the container
    /// time-ordered. Returns the index it landed at.
    pub fn insert(&mut self, item: T) -> usize {
        let idx = self.upper_bound_index(item.time());
        self.items.insert(idx, item);
        self.cache_hint.set(idx);
        idx
    }

    /// Removes every item and returns them, for callers that need to reset
    /// and replay (e.g. command-slice backward-time handling).
    pub fn drain_all(&mut self) -> Vec<T> {
        self.cache_hint.set(0);
        self.items.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cache_hint.set(0);
    }

    /// Index of the first item with `time > t` (upper bound).
    pub fn upper_bound_index(&self, t: Timestamp) -> usize {
        self.bound_index(t, true)
    }

    /// Index of the first item with `time >= t` (lower bound).
    pub fn lower_bound_index(&self, t: Timestamp) -> usize {
        self.bound_index(t, false)
    }

    fn bound_index(&self, t: Timestamp, strict_upper: bool) -> usize {
        let n = self.items.len();
        if n == 0 {
            return 0;
        }
        // predicate(i) == true means "item i belongs before the bound".
        // Monotonic over the whole sorted array: true for a prefix, false
        // for the rest. The boundary index is the first `false`.
        let predicate = |i: usize| {
            if strict_upper {
                self.items[i].time() <= t
            } else {
                self.items[i].time() < t
            }
        };

        // Try a small neighbor window around the cached hint before paying
        // for a full binary search; cheap because most lookups are
        // sequential (idle() advances time monotonically most of the time).
        let hint = self.cache_hint.get().min(n - 1);
        let lo_probe = hint.saturating_sub(CACHED_ITER_NEIGHBOR_WINDOW);
        let hi_probe = (hint + CACHED_ITER_NEIGHBOR_WINDOW).min(n - 1);
        if predicate(lo_probe) && !predicate(hi_probe) {
            // The true->false transition is guaranteed to live inside this
            // window because `predicate` is globally monotonic.
            let found = (lo_probe..=hi_probe)
                .find(|&i| !predicate(i))
                .expect("transition exists: predicate(hi_probe) is false");
            self.cache_hint.set(found);
            return found;
        }

        let idx = self.items.partition_point(|item| {
            if strict_upper {
                item.time() <= t
            } else {
                item.time() < t
            }
        });
        self.cache_hint.set(idx.min(n.saturating_sub(1)));
        idx
    }

    /// Drops the first `items.len() - n` records, freeing them (tail-keep).
    /// No-op if `n <= 0` or the container already has `<= n` items.
    pub fn limit_by_points(&mut self, n: i64) {
        if n <= 0 || self.items.is_empty() {
            return;
        }
        let n = n as usize;
        if self.items.len() > n {
            let drop_count = self.items.len() - n;
            self.items.drain(0..drop_count);
            self.cache_hint.set(0);
        }
    }

    /// Drops every record whose time is `< last.time - seconds`. No-op if
    /// `seconds <= 0` or the container is empty.
    pub fn limit_by_time(&mut self, seconds: f64) {
        if seconds <= 0.0 || self.items.is_empty() {
            return;
        }
        let cutoff = self.last_time().unwrap().minus_seconds(seconds);
        let drop_count = self.items.iter().take_while(|x| x.time() < cutoff).count();
        if drop_count > 0 {
            self.items.drain(0..drop_count);
            self.cache_hint.set(0);
        }
    }
}

impl<T: Timestamped> Default for SortedSamples<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bidirectional cursor over a [`SortedSamples`] container (section 4.4.6).
pub struct SliceIterator<'a, T: Timestamped> {
    items: &'a [T],
    /// Index of the item `next()` would return.
    pos: usize,
}

impl<'a, T: Timestamped> SliceIterator<'a, T> {
    pub fn new(container: &'a SortedSamples<T>) -> Self {
        Self {
            items: container.as_slice(),
            pos: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.items.len()
    }

    pub fn has_previous(&self) -> bool {
        self.pos > 0
    }

    pub fn peek_next(&self) -> Option<&'a T> {
        self.items.get(self.pos)
    }

    pub fn peek_previous(&self) -> Option<&'a T> {
        self.pos.checked_sub(1).and_then(|i| self.items.get(i))
    }

    pub fn next(&mut self) -> Option<&'a T> {
        let item = self.items.get(self.pos);
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    pub fn previous(&mut self) -> Option<&'a T> {
        self.pos = self.pos.checked_sub(1)?;
        self.items.get(self.pos)
    }

    pub fn to_front(&mut self) {
        self.pos = 0;
    }

    pub fn to_back(&mut self) {
        self.pos = self.items.len();
    }
}

impl<'a, T: Timestamped> Clone for SliceIterator<'a, T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items,
            pos: self.pos,
        }
    }
}

/// Read-only scan over a slice's samples.
pub trait Visitor<T> {
    fn visit(&mut self, item: &T);
}

/// Mutating scan over a slice's samples.
pub trait Modifier<T> {
    fn modify(&mut self, item: &mut T);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec(f64);
    impl Timestamped for Rec {
        fn time(&self) -> Timestamp {
            Timestamp::new(2024, self.0).unwrap()
        }
    }

    fn t(s: f64) -> Timestamp {
        Timestamp::new(2024, s).unwrap()
    }

    #[test]
    fn insert_keeps_sorted_order_regardless_of_insertion_order() {
        let mut s: SortedSamples<Rec> = SortedSamples::new();
        for v in [5.0, 1.0, 3.0, 2.0, 4.0] {
            s.insert(Rec(v));
        }
        let times: Vec<f64> = s.iter().map(|r| r.0).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn upper_bound_finds_first_strictly_greater() {
        let mut s: SortedSamples<Rec> = SortedSamples::new();
        for v in [1.0, 3.0, 5.0] {
            s.insert(Rec(v));
        }
        assert_eq!(s.upper_bound_index(t(3.0)), 2);
        assert_eq!(s.upper_bound_index(t(0.0)), 0);
        assert_eq!(s.upper_bound_index(t(10.0)), 3);
    }

    #[test]
    fn lower_bound_finds_first_not_less() {
        let mut s: SortedSamples<Rec> = SortedSamples::new();
        for v in [1.0, 3.0, 5.0] {
            s.insert(Rec(v));
        }
        assert_eq!(s.lower_bound_index(t(3.0)), 1);
        assert_eq!(s.lower_bound_index(t(3.5)), 2);
    }

    #[test]
    fn limit_by_points_keeps_tail() {
        let mut s: SortedSamples<Rec> = SortedSamples::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            s.insert(Rec(v));
        }
        s.limit_by_points(2);
        let times: Vec<f64> = s.iter().map(|r| r.0).collect();
        assert_eq!(times, vec![4.0, 5.0]);
    }

    #[test]
    fn limit_by_points_zero_is_noop() {
        let mut s: SortedSamples<Rec> = SortedSamples::new();
        s.insert(Rec(1.0));
        s.limit_by_points(0);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn limit_by_time_drops_too_old() {
        let mut s: SortedSamples<Rec> = SortedSamples::new();
        for v in [0.0, 5.0, 9.0, 10.0] {
            s.insert(Rec(v));
        }
        s.limit_by_time(3.0); // last=10, cutoff=7
        let times: Vec<f64> = s.iter().map(|r| r.0).collect();
        assert_eq!(times, vec![9.0, 10.0]);
    }

    #[test]
    fn iterator_bidirectional_navigation() {
        let mut s: SortedSamples<Rec> = SortedSamples::new();
        for v in [1.0, 2.0, 3.0] {
            s.insert(Rec(v));
        }
        let mut it = SliceIterator::new(&s);
        assert!(!it.has_previous());
        assert_eq!(it.next().unwrap().0, 1.0);
        assert_eq!(it.next().unwrap().0, 2.0);
        assert_eq!(it.peek_previous().unwrap().0, 2.0);
        assert_eq!(it.previous().unwrap().0, 2.0);
        it.to_back();
        assert!(!it.has_next());
        it.to_front();
        assert!(it.has_next());
    }
}
