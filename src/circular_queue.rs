use std::collections::VecDeque;
use std::fmt;

/// Fixed-capacity FIFO ring. Pushing onto a full queue evicts the oldest
/// entry. Iteration order is oldest to newest.
pub struct CircularQueue<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T> CircularQueue<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(cap),
            capacity: cap,
        }
    }

    /// Appends an item, returning the evicted oldest entry when full.
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.deque.pop_front()
        } else {
            None
        };

        self.deque.push_back(item);

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deque.clear()
    }

    #[inline]
    pub fn latest(&self) -> Option<&T> {
        self.deque.back()
    }

    #[inline]
    pub fn latest_mut(&mut self) -> Option<&mut T> {
        self.deque.back_mut()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter()
    }

    /// Iterates over the most recent `n` entries, oldest first.
    #[inline]
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &'_ T> {
        self.deque.iter().skip(self.deque.len().saturating_sub(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_within_capacity() {
        let mut q = CircularQueue::with_capacity(3);

        assert_eq!(q.push(1), None);
        assert_eq!(q.push(2), None);
        assert_eq!(q.len(), 2);
        assert!(!q.is_full());
    }

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut q = CircularQueue::with_capacity(3);
        q.push(1);
        q.push(2);
        q.push(3);

        assert_eq!(q.push(4), Some(1));
        assert_eq!(q.len(), 3);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut q = CircularQueue::with_capacity(5);
        for i in 0..100 {
            q.push(i);
        }

        assert_eq!(q.len(), 5);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![95, 96, 97, 98, 99]);
    }

    #[test]
    fn latest_is_newest() {
        let mut q = CircularQueue::with_capacity(2);
        q.push(10);
        q.push(20);
        q.push(30);

        assert_eq!(q.latest(), Some(&30));
    }

    #[test]
    fn recent_window() {
        let mut q = CircularQueue::with_capacity(10);
        for i in 0..6 {
            q.push(i);
        }

        assert_eq!(q.recent(3).copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        // window larger than contents yields everything
        assert_eq!(q.recent(100).count(), 6);
    }
}
