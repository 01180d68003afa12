use std::collections::VecDeque;

use super::state::MAX_BUFFER_CAPACITY;

/// Most recent decoded codes, oldest first.
///
/// Capacity is fixed at construction; pushing onto a full buffer evicts the oldest
/// entry, so the backing storage never reallocates on the per-frame path.
#[derive(Debug, Clone)]
pub struct DecodeBuffer {
    codes: VecDeque<String>,
    capacity: usize,
}

impl DecodeBuffer {
    /// `capacity` is clamped to `1..=MAX_BUFFER_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BUFFER_CAPACITY);
        Self {
            codes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `code`, returning the evicted entry if the buffer was full.
    pub fn push(&mut self, code: &str) -> Option<String> {
        let evicted = if self.codes.len() == self.capacity {
            self.codes.pop_front()
        } else {
            None
        };
        self.codes.push_back(code.to_string());
        evicted
    }

    pub fn occurrences(&self, code: &str) -> usize {
        self.codes.iter().filter(|c| c.as_str() == code).count()
    }

    pub fn clear(&mut self) {
        self.codes.clear();
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.codes.iter().cloned().collect()
    }
}
