//! Fixed-capacity ring buffer with oldest-eviction

use std::num::NonZeroUsize;

/// FIFO ring buffer that overwrites its oldest entry when full.
///
/// Slots live in a boxed slice allocated once; `head` points at the oldest
/// entry and both cursors wrap modulo capacity.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create buffer with specified capacity
    pub fn new(capacity: NonZeroUsize) -> Self {
        let slots = std::iter::repeat_with(|| None)
            .take(capacity.get())
            .collect();
        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    /// Append an item, returning the evicted oldest item if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let capacity = self.capacity();
        if self.len < capacity {
            let tail = (self.head + self.len) % capacity;
            self.slots[tail] = Some(item);
            self.len += 1;
            None
        } else {
            let evicted = self.slots[self.head].replace(item);
            self.head = (self.head + 1) % capacity;
            evicted
        }
    }

    /// Remove and return the oldest item
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        item
    }

    /// Oldest item without removing it
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Newest item without removing it
    pub fn last(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let tail = (self.head + self.len - 1) % self.capacity();
        self.slots[tail].as_ref()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: self,
            offset: 0,
        }
    }

    /// Drop every item; capacity is retained
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }

    /// Number of buffered items
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the next push will evict
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Snapshot of all items, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

/// Borrowing iterator over a [`RingBuffer`], oldest to newest
pub struct Iter<'a, T> {
    buffer: &'a RingBuffer<T>,
    offset: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.buffer.len {
            return None;
        }
        let index = (self.buffer.head + self.offset) % self.buffer.capacity();
        self.offset += 1;
        self.buffer.slots[index].as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len - self.offset;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
