//! Lazy set difference between a baseline set and a candidate sequence.
//!
//! For a baseline `A` and candidate `B`, [`DifferencingIterator`] yields
//! `B - (A ∩ B)` in candidate order. Once the candidate is exhausted,
//! [`common`](DifferencingIterator::common) holds `A ∩ B` and
//! [`not_common`](DifferencingIterator::not_common) holds `A - (A ∩ B)`.
//! Before exhaustion both accessors return `None`: the intermediate sets
//! say nothing useful about the final partition.
//!
//! The candidate is a fallible sequence (`Result<T, X>`); errors are passed
//! through unchanged and do not count as exhaustion.

use std::collections::HashSet;
use std::hash::Hash;

/// Differencing iterator over a baseline set and a candidate sequence.
pub struct DifferencingIterator<I, T> {
    not_common: HashSet<T>,
    common: HashSet<T>,
    source: I,
    exhausted: bool,
}

impl<I, T> DifferencingIterator<I, T>
where
    T: Eq + Hash,
{
    pub fn new(baseline: impl IntoIterator<Item = T>, source: I) -> Self {
        Self {
            not_common: baseline.into_iter().collect(),
            common: HashSet::new(),
            source,
            exhausted: false,
        }
    }

    /// Whether the candidate sequence has been fully drained.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Elements found in both inputs. `None` until the candidate is exhausted.
    pub fn common(&self) -> Option<&HashSet<T>> {
        self.exhausted.then_some(&self.common)
    }

    /// Baseline elements never seen in the candidate. `None` until the
    /// candidate is exhausted.
    pub fn not_common(&self) -> Option<&HashSet<T>> {
        self.exhausted.then_some(&self.not_common)
    }

    /// Split into `(common, not_common)` once exhausted, or give the
    /// iterator back if it is not.
    pub fn into_sets(self) -> Result<(HashSet<T>, HashSet<T>), Self> {
        if self.exhausted {
            Ok((self.common, self.not_common))
        } else {
            Err(self)
        }
    }
}

impl<I, T, X> Iterator for DifferencingIterator<I, T>
where
    I: Iterator<Item = Result<T, X>>,
    T: Eq + Hash + std::fmt::Debug,
{
    type Item = Result<T, X>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        loop {
            let next = match self.source.next() {
                None => {
                    self.exhausted = true;
                    return None;
                }
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(next)) => next,
            };
            if let Some(shared) = self.not_common.take(&next) {
                tracing::debug!(element = ?shared, "moving element from not-common to common");
                self.common.insert(shared);
            } else if self.common.contains(&next) {
                tracing::trace!(element = ?next, "element already known to be common");
            } else {
                return Some(Ok(next));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    fn ok<T>(items: Vec<T>) -> impl Iterator<Item = Result<T, Infallible>> {
        items.into_iter().map(Ok)
    }

    fn drain<I, T>(it: &mut DifferencingIterator<I, T>) -> Vec<T>
    where
        I: Iterator<Item = Result<T, Infallible>>,
        T: Eq + Hash + std::fmt::Debug,
    {
        it.by_ref().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn yields_only_new_elements() {
        let mut it = DifferencingIterator::new(vec![1, 2, 3], ok(vec![2, 4, 3, 5]));
        assert_eq!(drain(&mut it), vec![4, 5]);
        assert_eq!(it.common().unwrap(), &HashSet::from([2, 3]));
        assert_eq!(it.not_common().unwrap(), &HashSet::from([1]));
    }

    #[test]
    fn accessors_unavailable_before_exhaustion() {
        let mut it = DifferencingIterator::new(vec![1], ok(vec![1, 2, 3]));
        assert!(it.common().is_none());
        assert!(it.not_common().is_none());
        assert_eq!(it.next().unwrap().unwrap(), 2);
        assert!(it.common().is_none());
        assert_eq!(it.next().unwrap().unwrap(), 3);
        // The source is at its end but has not said so yet.
        assert!(it.common().is_none());
        assert!(it.next().is_none());
        assert!(it.is_exhausted());
        assert!(it.common().is_some());
    }

    #[test]
    fn empty_baseline_is_pass_through() {
        let mut it = DifferencingIterator::new(Vec::<i32>::new(), ok(vec![3, 1, 3]));
        assert_eq!(drain(&mut it), vec![3, 1, 3]);
        assert!(it.common().unwrap().is_empty());
        assert!(it.not_common().unwrap().is_empty());
    }

    #[test]
    fn empty_candidate_leaves_baseline_not_common() {
        let mut it = DifferencingIterator::new(vec![1, 2], ok(Vec::<i32>::new()));
        assert!(drain(&mut it).is_empty());
        assert!(it.common().unwrap().is_empty());
        assert_eq!(it.not_common().unwrap(), &HashSet::from([1, 2]));
    }

    #[test]
    fn repeated_common_element_is_never_yielded() {
        let mut it = DifferencingIterator::new(vec![7], ok(vec![7, 7, 8, 7]));
        assert_eq!(drain(&mut it), vec![8]);
        assert_eq!(it.common().unwrap(), &HashSet::from([7]));
    }

    #[test]
    fn trailing_common_elements_end_the_sequence() {
        let mut it = DifferencingIterator::new(vec![1, 2], ok(vec![9, 1, 2]));
        assert_eq!(it.next().unwrap().unwrap(), 9);
        assert!(it.next().is_none());
        assert!(it.next().is_none());
        assert_eq!(it.not_common().unwrap().len(), 0);
    }

    #[test]
    fn errors_pass_through_without_exhausting() {
        let source = vec![Ok(1), Err("boom"), Ok(2)].into_iter();
        let mut it = DifferencingIterator::new(vec![1], source);
        assert_eq!(it.next(), Some(Err("boom")));
        assert!(it.common().is_none());
        assert_eq!(it.next(), Some(Ok(2)));
        assert_eq!(it.next(), None);
        assert_eq!(it.common().unwrap(), &HashSet::from([1]));
    }

    #[test]
    fn partition_property_holds() {
        let baseline: Vec<u32> = (0..50).filter(|n| n % 3 == 0).collect();
        let candidate: Vec<u32> = (0..60).filter(|n| n % 2 == 0).chain(0..10).collect();
        let mut it = DifferencingIterator::new(baseline.clone(), ok(candidate.clone()));
        let yielded = drain(&mut it);
        let (common, not_common) = it.into_sets().ok().unwrap();

        let b: HashSet<u32> = baseline.iter().copied().collect();
        let c: HashSet<u32> = candidate.iter().copied().collect();
        assert!(yielded.iter().all(|e| !b.contains(e)));
        assert_eq!(common, b.intersection(&c).copied().collect());
        assert_eq!(not_common, b.difference(&common).copied().collect());
        // Every candidate element is either yielded or common.
        assert!(candidate.iter().all(|e| yielded.contains(e) || common.contains(e)));
    }

    #[test]
    fn into_sets_refuses_before_exhaustion() {
        let it = DifferencingIterator::new(vec![1], ok(vec![1, 2]));
        assert!(it.into_sets().is_err());
    }
}
