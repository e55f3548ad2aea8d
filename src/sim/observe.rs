//! Snapshot publishing for render-layer observers
//!
//! Observers receive a read-only slice of the current list. They must not call
//! back into the publishing subsystem from inside the callback.

/// Handle returned by a subsystem's `subscribe_*` method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub type Observer<T> = Box<dyn FnMut(&[T])>;

pub struct Observers<T> {
    next_id: u64,
    list: Vec<(ObserverId, Observer<T>)>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            list: Vec::new(),
        }
    }
}

impl<T: 'static> Observers<T> {
    /// Register `observer` and hand it the current snapshot right away
    pub fn add<F>(&mut self, mut observer: F, current: &[T]) -> ObserverId
    where
        F: FnMut(&[T]) + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        observer(current);
        self.list.push((id, Box::new(observer)));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.list.len();
        self.list.retain(|(existing, _)| *existing != id);
        self.list.len() != before
    }

    pub fn publish(&mut self, items: &[T]) {
        for (_, observer) in &mut self.list {
            observer(items);
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_add_publishes_current_then_updates() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut observers = Observers::<u32>::default();
        let id = observers.add(move |items: &[u32]| sink.borrow_mut().push(items.len()), &[1, 2]);

        observers.publish(&[1, 2, 3]);
        assert!(observers.remove(id));
        observers.publish(&[]);

        assert_eq!(*seen.borrow(), [2, 3]);
        assert!(!observers.remove(id));
        assert!(observers.is_empty());
    }
}
