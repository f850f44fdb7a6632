// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::iter::FusedIterator;

use crate::KernelError;

/// A lazy traversal over an engine-owned collection.
///
/// The collection size is read from the engine once, when the traversal is
/// created. Each step asks the engine for the element at the current position
/// and wraps it in a freshly owned object; nothing is cached. Creating a new
/// traversal always starts again at position 0.
///
/// The parent is borrowed for the whole traversal, so it cannot be released
/// halfway through.
pub struct Iter<'a, P, T> {
    parent: &'a P,
    current: usize,
    size: usize,
    get_fn: fn(&P, usize) -> Result<T, KernelError>,
}

impl<'a, P, T> Iter<'a, P, T> {
    pub(crate) fn new(
        parent: &'a P,
        size: usize,
        get_fn: fn(&P, usize) -> Result<T, KernelError>,
    ) -> Self {
        Self {
            parent,
            current: 0,
            size,
            get_fn,
        }
    }

    /// Returns true while elements remain.
    pub fn has_next(&self) -> bool {
        self.current < self.size
    }

    /// Returns the next element and advances.
    ///
    /// # Errors
    /// Returns [`KernelError::NoSuchElement`] once the traversal is exhausted,
    /// or the engine error raised while fetching the element.
    pub fn try_next(&mut self) -> Result<T, KernelError> {
        if !self.has_next() {
            return Err(KernelError::NoSuchElement);
        }
        let item = (self.get_fn)(self.parent, self.current);
        self.current += 1;
        item
    }
}

impl<'a, P, T> Iterator for Iter<'a, P, T> {
    type Item = Result<T, KernelError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        Some(self.try_next())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.size.saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl<'a, P, T> ExactSizeIterator for Iter<'a, P, T> {}

impl<'a, P, T> FusedIterator for Iter<'a, P, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Numbers(Vec<u32>);

    fn get(numbers: &Numbers, index: usize) -> Result<u32, KernelError> {
        numbers.0.get(index).copied().ok_or(KernelError::IndexOutOfRange {
            index,
            size: numbers.0.len(),
        })
    }

    #[test]
    fn test_traversal_order_and_exhaustion() {
        let numbers = Numbers(vec![3, 1, 4]);
        let mut iter = Iter::new(&numbers, numbers.0.len(), get);
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.try_next().unwrap(), 3);
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        assert!(iter.has_next());
        assert_eq!(iter.try_next().unwrap(), 4);
        assert!(!iter.has_next());
        assert!(iter.next().is_none());
        assert!(matches!(iter.try_next(), Err(KernelError::NoSuchElement)));
    }

    #[test]
    fn test_empty_traversal() {
        let numbers = Numbers(vec![]);
        let mut iter = Iter::new(&numbers, 0, get);
        assert!(!iter.has_next());
        assert_eq!(iter.len(), 0);
        assert!(matches!(iter.try_next(), Err(KernelError::NoSuchElement)));
    }

    #[test]
    fn test_size_is_fixed_at_start() {
        let numbers = Numbers(vec![7, 8]);
        // A size larger than the backing collection surfaces the fetch error
        // instead of ending the traversal early.
        let items: Vec<_> = Iter::new(&numbers, 3, get).collect();
        assert_eq!(items.len(), 3);
        assert!(matches!(
            items[2],
            Err(KernelError::IndexOutOfRange { index: 2, size: 2 })
        ));
    }
}
