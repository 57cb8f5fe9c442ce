//! A fixed-capacity bit set over node indices.
//!
//! Dominator sets are the main consumer: every reachable node of a graph owns one set
//! with one bit per arena slot, and the iterative fixpoint repeatedly intersects them.
//! Packing 64 members into a word keeps those intersections cheap even for methods
//! with thousands of instructions.
//!
//! # Example
//!
//! ```rust
//! use tacopt::utils::BitSet;
//!
//! let mut doms = BitSet::full(8);
//! let mut pred = BitSet::new(8);
//! pred.insert(0);
//! pred.insert(3);
//!
//! assert!(doms.intersect_with(&pred));
//! assert!(doms.insert(5));
//! assert_eq!(doms.iter().collect::<Vec<_>>(), vec![0, 3, 5]);
//! ```

/// A bit vector with a fixed number of addressable members.
///
/// Indices at or beyond the capacity are never members: `contains` answers `false`
/// for them and `insert` ignores them.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    /// The bits, stored as a vector of words.
    words: Vec<u64>,
    /// The number of addressable bits.
    len: usize,
}

impl BitSet {
    /// Creates a new empty bit set able to hold indices `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            len: capacity,
        }
    }

    /// Creates a bit set with every index `0..capacity` present.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self {
            words: vec![u64::MAX; capacity.div_ceil(64)],
            len: capacity,
        };
        set.clear_excess();
        set
    }

    /// Returns the capacity of this bit set.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.len
    }

    /// Returns `true` if no index is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Adds `index` to the set.
    ///
    /// Returns `true` if the index was not present before. Out of range indices are
    /// ignored and report `false`.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, mask) = Self::locate(index);
        let old = self.words[word];
        self.words[word] |= mask;
        old != self.words[word]
    }

    /// Removes `index` from the set, returning `true` if it was present.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, mask) = Self::locate(index);
        let old = self.words[word];
        self.words[word] &= !mask;
        old != self.words[word]
    }

    /// Returns `true` if `index` is present.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// Returns the number of present indices.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Intersects `self` with `other` in place.
    ///
    /// Returns `true` if `self` changed. Sets of different capacity are intersected
    /// over the shorter range; indices beyond it are dropped.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (i, a) in self.words.iter_mut().enumerate() {
            let old = *a;
            *a &= other.words.get(i).copied().unwrap_or(0);
            changed |= old != *a;
        }
        changed
    }

    /// Unions `other` into `self` in place, returning `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            let old = *a;
            *a |= *b;
            changed |= old != *a;
        }
        self.clear_excess();
        changed
    }

    /// Returns `true` if every member of `self` is also a member of `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.words
            .iter()
            .enumerate()
            .all(|(i, &w)| w & !other.words.get(i).copied().unwrap_or(0) == 0)
    }

    /// Returns an iterator over the present indices in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    #[inline]
    const fn locate(index: usize) -> (usize, u64) {
        (index / 64, 1u64 << (index % 64))
    }

    fn clear_excess(&mut self) {
        if !self.len.is_multiple_of(64) {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << (self.len % 64)) - 1;
            }
        }
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the present indices of a [`BitSet`].
pub struct BitSetIter<'a> {
    set: &'a BitSet,
    word_idx: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * 64 + bit);
            }
            self.word_idx += 1;
            self.current = *self.set.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_insert_reports_change() {
        let mut bs = BitSet::new(100);
        assert!(bs.is_empty());

        assert!(bs.insert(0));
        assert!(bs.insert(99));
        assert!(!bs.insert(99));
        assert!(!bs.insert(100));

        assert_eq!(bs.count(), 2);
        assert!(bs.contains(99));
        assert!(!bs.contains(100));
    }

    #[test]
    fn test_bitset_remove() {
        let mut bs = BitSet::new(70);
        bs.insert(65);
        assert!(bs.remove(65));
        assert!(!bs.remove(65));
        assert!(bs.is_empty());
    }

    #[test]
    fn test_bitset_full_respects_capacity() {
        let bs = BitSet::full(70);
        assert_eq!(bs.count(), 70);
        assert!(bs.contains(69));
        assert!(!bs.contains(70));
    }

    #[test]
    fn test_bitset_intersect() {
        let mut a = BitSet::full(10);
        let mut b = BitSet::new(10);
        b.insert(2);
        b.insert(7);

        assert!(a.intersect_with(&b));
        assert!(!a.intersect_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![2, 7]);
    }

    #[test]
    fn test_bitset_union_and_subset() {
        let mut a = BitSet::new(130);
        let mut b = BitSet::new(130);
        a.insert(1);
        b.insert(1);
        b.insert(128);

        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(a.union_with(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_bitset_iter_across_words() {
        let mut bs = BitSet::new(200);
        for i in [0, 63, 64, 127, 199] {
            bs.insert(i);
        }
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![0, 63, 64, 127, 199]);
        assert_eq!(format!("{bs:?}"), "{0, 63, 64, 127, 199}");
    }
}
