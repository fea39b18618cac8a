//! Sparse-array decoding with a shared, identity-keyed cache.
//!
//! A sparse array declares a logical length `n`, parallel index/value lists,
//! and a default for unlisted indices; indexing is 1-based throughout.
//! Decoding produces a sorted index-to-value map, cached per array
//! *identity* rather than per value, since arrays carry no deep hash
//! contract here. Decoding is pure, so eviction is always legal: an entry
//! is dropped with its array and recomputed on the next miss.
//!
//! The cache is the one shared mutable structure in the crate; a concurrent
//! map with recompute-on-miss keeps concurrent evaluations coherent without
//! global locks.
//!
//! # Example
//!
//! ```
//! use modeleval::schema::RealSparseArray;
//!
//! let array = RealSparseArray::new(Some(5), vec![2, 4], vec![10.0, 20.0], 0.0);
//! assert_eq!(array.get(2).unwrap(), 10.0);
//! assert_eq!(array.get(1).unwrap(), 0.0);
//! assert!(array.get(6).is_err());
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

type Cache<T> = DashMap<u64, Arc<BTreeMap<usize, T>>>;

/// Element types a sparse array may hold.
pub trait SparseElement: Copy + Send + Sync + 'static {
    #[doc(hidden)]
    fn cache() -> &'static Cache<Self>;

    #[doc(hidden)]
    fn to_f64(self) -> f64;
}

impl SparseElement for f64 {
    fn cache() -> &'static Cache<Self> {
        static CACHE: OnceLock<Cache<f64>> = OnceLock::new();
        CACHE.get_or_init(DashMap::new)
    }

    fn to_f64(self) -> f64 {
        self
    }
}

impl SparseElement for i64 {
    fn cache() -> &'static Cache<Self> {
        static CACHE: OnceLock<Cache<i64>> = OnceLock::new();
        CACHE.get_or_init(DashMap::new)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// A declared or inferred-length sparse array with a decode cache.
#[derive(Debug, Serialize, Deserialize)]
pub struct SparseArray<T: SparseElement> {
    /// Stable identity token; never serialized, fresh per instance.
    #[serde(skip, default = "next_id")]
    id: u64,
    /// Declared logical length.
    pub n: Option<usize>,
    /// 1-based indices, parallel to `entries`.
    pub indices: Vec<usize>,
    pub entries: Vec<T>,
    /// Value of every index within `[1, n]` not listed in `indices`.
    pub default_value: T,
}

/// Sparse array of doubles.
pub type RealSparseArray = SparseArray<f64>;

/// Sparse array of integers.
pub type IntSparseArray = SparseArray<i64>;

impl<T: SparseElement> SparseArray<T> {
    pub fn new(n: Option<usize>, indices: Vec<usize>, entries: Vec<T>, default_value: T) -> Self {
        Self {
            id: next_id(),
            n,
            indices,
            entries,
            default_value,
        }
    }

    /// Decode into the sorted index-to-value mapping, through the cache.
    pub fn content(&self) -> Result<Arc<BTreeMap<usize, T>>> {
        if let Some(content) = T::cache().get(&self.id) {
            return Ok(Arc::clone(&content));
        }

        let content = Arc::new(self.parse()?);
        T::cache().insert(self.id, Arc::clone(&content));
        Ok(content)
    }

    /// Decode without touching the cache.
    ///
    /// Validates the parallel-list invariant and that the declared length
    /// can hold every listed entry.
    pub fn parse(&self) -> Result<BTreeMap<usize, T>> {
        if self.indices.len() != self.entries.len() {
            return Err(EvalError::InvalidFeature(format!(
                "sparse array index/value lists differ in length: {} vs {}",
                self.indices.len(),
                self.entries.len()
            )));
        }

        let mut content = BTreeMap::new();
        for (&index, &entry) in self.indices.iter().zip(&self.entries) {
            self.check_index(index)?;
            content.insert(index, entry);
        }

        if let Some(n) = self.n {
            if n < content.len() {
                return Err(EvalError::InvalidFeature(format!(
                    "sparse array declares n={n} but lists {} entries",
                    content.len()
                )));
            }
        }

        Ok(content)
    }

    /// Read the value at a 1-based index.
    ///
    /// Unlisted indices within `[1, n]` read the default; indices out of
    /// range are an evaluation failure.
    pub fn get(&self, index: usize) -> Result<T> {
        match self.content()?.get(&index) {
            Some(value) => Ok(*value),
            None => {
                self.check_index(index)?;
                Ok(self.default_value)
            }
        }
    }

    /// The logical length: declared `n`, else the number of listed entries.
    pub fn size(&self) -> Result<usize> {
        match self.n {
            Some(n) => Ok(n),
            None => Ok(self.content()?.len()),
        }
    }

    /// Densify into a `Vec<f64>` of [`size`](Self::size) elements.
    pub fn to_vec(&self) -> Result<Vec<f64>> {
        (1..=self.size()?)
            .map(|i| Ok(self.get(i)?.to_f64()))
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let out_of_range = index < 1 || self.n.is_some_and(|n| index > n);
        if out_of_range {
            return Err(EvalError::Evaluation(format!(
                "sparse array index {index} out of range"
            )));
        }
        Ok(())
    }
}

impl<T: SparseElement> Clone for SparseArray<T> {
    fn clone(&self) -> Self {
        // A clone is a distinct identity; it decodes independently.
        Self {
            id: next_id(),
            n: self.n,
            indices: self.indices.clone(),
            entries: self.entries.clone(),
            default_value: self.default_value,
        }
    }
}

impl<T: SparseElement> Drop for SparseArray<T> {
    fn drop(&mut self) {
        T::cache().remove(&self.id);
    }
}

impl<T: SparseElement + PartialEq> PartialEq for SparseArray<T> {
    fn eq(&self, other: &Self) -> bool {
        // Identity is cache bookkeeping, not value.
        self.n == other.n
            && self.indices == other.indices
            && self.entries == other.entries
            && self.default_value == other.default_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_default_and_out_of_range() {
        let array = RealSparseArray::new(Some(5), vec![2, 4], vec![10.0, 20.0], 0.0);

        assert_eq!(array.get(1).unwrap(), 0.0);
        assert_eq!(array.get(2).unwrap(), 10.0);
        assert_eq!(array.get(4).unwrap(), 20.0);
        assert!(matches!(array.get(6), Err(EvalError::Evaluation(_))));
        assert!(matches!(array.get(0), Err(EvalError::Evaluation(_))));
    }

    #[test]
    fn mismatched_lists_are_invalid() {
        let array = RealSparseArray::new(Some(3), vec![1, 2], vec![1.0], 0.0);
        assert!(matches!(
            array.content(),
            Err(EvalError::InvalidFeature(_))
        ));
    }

    #[test]
    fn declared_length_must_hold_entries() {
        let array = IntSparseArray::new(Some(1), vec![1, 2], vec![1, 2], 0);
        assert!(array.parse().is_err());
    }

    #[test]
    fn size_prefers_declared_length() {
        let declared = RealSparseArray::new(Some(5), vec![1], vec![1.0], 0.0);
        assert_eq!(declared.size().unwrap(), 5);

        let inferred = RealSparseArray::new(None, vec![1, 3], vec![1.0, 3.0], 0.0);
        assert_eq!(inferred.size().unwrap(), 2);
    }

    #[test]
    fn densify() {
        let array = IntSparseArray::new(Some(4), vec![2], vec![7], 1);
        assert_eq!(array.to_vec().unwrap(), vec![1.0, 7.0, 1.0, 1.0]);
    }

    #[test]
    fn clones_decode_independently() {
        let a = RealSparseArray::new(Some(3), vec![1], vec![5.0], 0.0);
        let b = a.clone();

        assert_eq!(a, b);
        a.content().unwrap();
        b.content().unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn cache_entry_dies_with_the_array() {
        let id;
        {
            let array = RealSparseArray::new(Some(2), vec![1], vec![1.0], 0.0);
            id = array.id;
            array.content().unwrap();
            assert!(f64::cache().contains_key(&id));
        }
        assert!(!f64::cache().contains_key(&id));
    }
}
