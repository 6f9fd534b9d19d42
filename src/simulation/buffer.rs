/// Append-only buffer that silently stops accepting items at its capacity
///
/// Retention is first-come: once full, later items are dropped rather than
/// replacing earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct CappedBuffer<T> {
    items: Vec<T>,
    cap: usize,
}

impl<T> CappedBuffer<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            // Large caps are only reached for large runs; grow on demand
            items: Vec::with_capacity(cap.min(1024)),
            cap,
        }
    }

    /// Returns whether the item was kept
    pub fn push(&mut self, item: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Append another buffer's items in order until this one is full
    pub fn absorb(&mut self, other: CappedBuffer<T>) {
        let room = self.remaining();
        self.items.extend(other.items.into_iter().take(room));
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.cap
    }

    pub fn remaining(&self) -> usize {
        self.cap.saturating_sub(self.items.len())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}
