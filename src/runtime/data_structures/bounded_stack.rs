/// The outcome of a stack operation.  Stack exhaustion is not an error in this language: words
/// check the status and quietly do nothing when they can't get what they need.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StackStatus {
    Ok,
    Empty,
    Full,
}

/// A fixed capacity stack.  The data stack holds values and the control stack holds return frames,
/// both are one of these with a different item type.
#[derive(Clone)]
pub struct BoundedStack<T: Copy + Default> {
    items: Vec<T>,
    capacity: usize,
}

impl<T: Copy + Default> BoundedStack<T> {
    /// Create an empty stack that holds at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        BoundedStack {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Push an item.  A full stack is left unchanged.
    #[inline]
    pub fn push(&mut self, item: T) -> StackStatus {
        if self.items.len() >= self.capacity {
            return StackStatus::Full;
        }

        self.items.push(item);
        StackStatus::Ok
    }

    /// Pop the top item.  An empty stack hands back `T::default()` along with the empty status.
    #[inline]
    pub fn pop(&mut self) -> (T, StackStatus) {
        match self.items.pop() {
            Some(item) => (item, StackStatus::Ok),
            None => (T::default(), StackStatus::Empty),
        }
    }

    /// Pop the top `count` items, oldest first.  If fewer than `count` items are present nothing is
    /// removed.
    pub fn pop_many(&mut self, count: usize) -> Option<Vec<T>> {
        if self.items.len() < count {
            return None;
        }

        let start = self.items.len() - count;
        Some(self.items.split_off(start))
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop items until at most `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        self.items.truncate(depth);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The items from the bottom of the stack to the top.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pop_from_empty_returns_default() {
        let mut stack = BoundedStack::<i32>::new(2);

        assert_eq!(stack.pop(), (0, StackStatus::Empty));
    }

    #[test]
    fn pop_many_is_all_or_nothing() {
        let mut stack = BoundedStack::<i32>::new(4);

        stack.push(1);
        stack.push(2);

        assert_eq!(stack.pop_many(3), None);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop_many(2), Some(vec![1, 2]));
        assert!(stack.is_empty());
    }

    proptest! {
        #[test]
        fn capacity_is_honoured(capacity in 1usize..64, values in proptest::collection::vec(any::<i32>(), 64)) {
            let mut stack = BoundedStack::new(capacity);

            for value in values.iter().take(capacity) {
                prop_assert_eq!(stack.push(*value), StackStatus::Ok);
            }

            let before = stack.as_slice().to_vec();
            prop_assert_eq!(stack.push(1), StackStatus::Full);
            prop_assert_eq!(stack.as_slice(), &before[..]);

            for value in values.iter().take(capacity).rev() {
                prop_assert_eq!(stack.pop(), (*value, StackStatus::Ok));
            }

            prop_assert_eq!(stack.pop(), (0, StackStatus::Empty));
        }
    }
}
