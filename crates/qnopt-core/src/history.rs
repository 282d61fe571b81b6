//! Ring buffer of curvature pairs for limited-memory quasi-Newton methods.
//!
//! Each entry stores `s = x_{k+1} - x_k`, `y = g_{k+1} - g_k`, `yᵀs` and the
//! scratch coefficient `α` of the two-loop recursion. Storage for all `m`
//! entries is allocated up front and recycled as new pairs are pushed.

use crate::types::{DVector, Scalar};

/// One `(s, y)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<T: Scalar> {
    /// Change in position.
    pub s: DVector<T>,
    /// Change in gradient.
    pub y: DVector<T>,
    /// Curvature `yᵀs`.
    pub ys: T,
    /// Two-loop coefficient, valid only during a direction computation.
    pub alpha: T,
}

impl<T: Scalar> HistoryEntry<T> {
    fn zeros(n: usize) -> Self {
        Self {
            s: DVector::zeros(n),
            y: DVector::zeros(n),
            ys: T::zero(),
            alpha: T::zero(),
        }
    }
}

/// Fixed-capacity circular buffer of [`HistoryEntry`] values.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T: Scalar> {
    entries: Vec<HistoryEntry<T>>,
    head: usize,
    len: usize,
    dimension: usize,
}

impl<T: Scalar> HistoryBuffer<T> {
    /// Allocates room for `capacity` pairs of dimension `n`.
    pub fn new(capacity: usize, n: usize) -> Self {
        Self {
            entries: (0..capacity).map(|_| HistoryEntry::zeros(n)).collect(),
            head: 0,
            len: 0,
            dimension: n,
        }
    }

    /// Maximum number of stored pairs.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no pair is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimension of the stored vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Memory held by the stored pairs, in bytes.
    pub fn memory_usage(&self) -> usize {
        self.capacity() * (2 * self.dimension + 2) * std::mem::size_of::<T>()
    }

    /// Forgets every stored pair, keeping the allocation.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Clears the buffer and reallocates it if the shape changed.
    pub fn reset(&mut self, capacity: usize, n: usize) {
        if self.capacity() != capacity || self.dimension != n {
            *self = Self::new(capacity, n);
        } else {
            self.clear();
        }
    }

    /// Stores a new pair, overwriting the oldest one when full.
    pub fn push(&mut self, s: &DVector<T>, y: &DVector<T>, ys: T) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }
        let entry = &mut self.entries[self.head];
        entry.s.copy_from(s);
        entry.y.copy_from(y);
        entry.ys = ys;
        entry.alpha = T::zero();

        self.head = (self.head + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
    }

    /// The most recently pushed pair.
    pub fn newest(&self) -> Option<&HistoryEntry<T>> {
        if self.is_empty() {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        Some(&self.entries[idx])
    }

    /// Stored pairs from newest to oldest.
    pub fn newest_first_mut(&mut self) -> impl Iterator<Item = &mut HistoryEntry<T>> + '_ {
        let len = self.len;
        let (before, after) = self.entries.split_at_mut(self.head);
        before.iter_mut().rev().chain(after.iter_mut().rev()).take(len)
    }

    /// Stored pairs from oldest to newest.
    pub fn oldest_first_mut(&mut self) -> impl Iterator<Item = &mut HistoryEntry<T>> + '_ {
        let unused = self.capacity() - self.len;
        let (before, after) = self.entries.split_at_mut(self.head);
        after.iter_mut().chain(before.iter_mut()).skip(unused)
    }

    /// Replaces `d` by `H·d`, where `H` is the limited-memory inverse Hessian
    /// approximation built from the stored pairs (two-loop recursion).
    ///
    /// The initial matrix is `γI` with `γ = yᵀs / yᵀy` of the newest pair.
    /// With an empty buffer `d` is left unchanged.
    pub fn apply_inverse_hessian(&mut self, d: &mut DVector<T>) {
        for entry in self.newest_first_mut() {
            entry.alpha = entry.s.dot(&*d) / entry.ys;
            d.axpy(-entry.alpha, &entry.y, T::one());
        }

        if let Some(newest) = self.newest() {
            let gamma = newest.ys / newest.y.norm_squared();
            *d *= gamma;
        }

        for entry in self.oldest_first_mut() {
            let beta = entry.y.dot(&*d) / entry.ys;
            d.axpy(entry.alpha - beta, &entry.s, T::one());
        }
    }
}
