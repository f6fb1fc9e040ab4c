//! Index-reporting binary min-heap
//!
//! Backs the delay queue. `std::collections::BinaryHeap` cannot report
//! where an inserted element landed, and the delay queue needs exactly
//! that: an insertion that ends up at index 0 is a new head and must wake
//! the sleeping consumer. So the heap is hand-rolled over a `Vec`.
//!
//! # Complexity
//!
//! - `add`: O(log n)
//! - `peek`: O(1)
//! - `shift` / `priority_shift`: O(log n)
//!
//! The backing storage shrinks when length drops below half of capacity,
//! floored at the initial capacity, so a burst of entries does not pin
//! memory for the lifetime of the queue.

struct Entry<T> {
    value: T,
    priority: i64,
}

/// Array-backed binary min-heap ordered by `i64` priority (lower = earlier).
pub struct PriorityQueue<T> {
    entries: Vec<Entry<T>>,
    floor: usize,
}

impl<T> PriorityQueue<T> {
    /// Create a heap with the given initial capacity. The capacity also
    /// serves as the lower bound for shrink-to-fit.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            floor: capacity,
        }
    }

    /// Number of queued entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a value and return its final index in the heap array.
    ///
    /// Index 0 means the insertion became the new head.
    pub fn add(&mut self, value: T, priority: i64) -> usize {
        self.entries.push(Entry { value, priority });
        self.sift_up(self.entries.len() - 1)
    }

    /// The head value, if any.
    pub fn peek(&self) -> Option<&T> {
        self.entries.first().map(|e| &e.value)
    }

    /// The head priority, if any.
    pub fn peek_priority(&self) -> Option<i64> {
        self.entries.first().map(|e| e.priority)
    }

    /// Pop the head value.
    pub fn shift(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.remove_head().value)
    }

    /// Pop the head iff its priority is at most `max_priority`.
    ///
    /// Returns `(None, 0)` when the heap is empty and `(None, head)` when
    /// the head is not ready yet, so the caller knows how long to sleep.
    pub fn priority_shift(&mut self, max_priority: i64) -> (Option<T>, i64) {
        match self.entries.first() {
            None => (None, 0),
            Some(head) if head.priority > max_priority => (None, head.priority),
            _ => {
                let entry = self.remove_head();
                (Some(entry.value), entry.priority)
            }
        }
    }

    fn remove_head(&mut self) -> Entry<T> {
        let entry = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        self.maybe_shrink();
        entry
    }

    fn maybe_shrink(&mut self) {
        let cap = self.entries.capacity();
        if cap > self.floor && self.entries.len() < cap / 2 {
            self.entries.shrink_to((cap / 2).max(self.floor));
        }
    }

    fn sift_up(&mut self, mut i: usize) -> usize {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.entries[i].priority >= self.entries[parent].priority {
                break;
            }
            self.entries.swap(i, parent);
            i = parent;
        }
        i
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.entries.len();
        loop {
            let mut min = i;
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            if left < len && self.entries[left].priority < self.entries[min].priority {
                min = left;
            }
            if right < len && self.entries[right].priority < self.entries[min].priority {
                min = right;
            }
            if min == i {
                return;
            }
            self.entries.swap(i, min);
            i = min;
        }
    }
}
