/// SSM Kernel v1 — Thread Registry
///
/// Maps thread_id → AccumulatorState. Lookup-or-create is the only
/// way in; there is no removal. Threads are kept in first-seen order.

use std::collections::BTreeMap;

use crate::state::{create_initial_state, AccumulatorState};

/// Stable handle to a registered thread. Valid for the life of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadHandle(usize);

impl ThreadHandle {
    /// Position of the thread in first-seen order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A thread's accumulator plus its id.
#[derive(Debug, Clone)]
pub struct ThreadLane {
    pub thread_id: String,
    pub state: AccumulatorState,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadRegistry {
    lanes: Vec<ThreadLane>,
    index: BTreeMap<String, usize>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `thread_id`, creating a zeroed state on first sight.
    /// Idempotent: repeated calls with the same id return the same handle.
    pub fn get_or_create(&mut self, thread_id: &str) -> ThreadHandle {
        if let Some(&i) = self.index.get(thread_id) {
            return ThreadHandle(i);
        }
        let i = self.lanes.len();
        self.lanes.push(ThreadLane {
            thread_id: thread_id.to_string(),
            state: create_initial_state(),
        });
        self.index.insert(thread_id.to_string(), i);
        tracing::debug!(thread = thread_id, "thread registered");
        ThreadHandle(i)
    }

    /// Look up an existing thread without creating it.
    pub fn handle(&self, thread_id: &str) -> Option<ThreadHandle> {
        self.index.get(thread_id).copied().map(ThreadHandle)
    }

    pub fn state(&self, handle: ThreadHandle) -> &AccumulatorState {
        &self.lanes[handle.0].state
    }

    pub fn state_mut(&mut self, handle: ThreadHandle) -> &mut AccumulatorState {
        &mut self.lanes[handle.0].state
    }

    pub fn thread_id(&self, handle: ThreadHandle) -> &str {
        &self.lanes[handle.0].thread_id
    }

    /// Lanes in first-seen order.
    pub fn lanes(&self) -> &[ThreadLane] {
        &self.lanes
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut reg = ThreadRegistry::new();
        let a = reg.get_or_create("chat");
        let b = reg.get_or_create("chat");
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
        assert_eq!(*reg.state(a), AccumulatorState::default());
    }

    #[test]
    fn test_first_seen_order_kept() {
        let mut reg = ThreadRegistry::new();
        for id in ["updates", "main", "audit", "main"] {
            reg.get_or_create(id);
        }
        let ids: Vec<&str> = reg.lanes().iter().map(|l| l.thread_id.as_str()).collect();
        assert_eq!(ids, vec!["updates", "main", "audit"]);
    }

    #[test]
    fn test_handle_stays_valid_after_growth() {
        let mut reg = ThreadRegistry::new();
        let h = reg.get_or_create("t1");
        reg.state_mut(h).w = 3.0;
        for i in 0..64 {
            reg.get_or_create(&format!("x{}", i));
        }
        assert_eq!(reg.state(h).w, 3.0);
        assert_eq!(reg.thread_id(h), "t1");
        assert_eq!(reg.handle("t1"), Some(h));
        assert_eq!(reg.handle("missing"), None);
    }
}
