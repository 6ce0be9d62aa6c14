//! Task Queues
//!
//! Lock-guarded FIFO queues. Written only by the coordinator thread; any
//! thread may scan them for a snapshot.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::tasks::{Task, TaskKey};

pub(crate) struct TaskQueue<K, R> {
    name: &'static str,
    tasks: RwLock<VecDeque<Arc<Task<K, R>>>>,
}

impl<K: TaskKey, R: Send + Sync + 'static> TaskQueue<K, R> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            tasks: RwLock::new(VecDeque::new()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn push_back(&self, task: Arc<Task<K, R>>) {
        self.tasks.write().push_back(task);
    }

    /// Remove this exact task (by identity); returns whether it was present
    pub(crate) fn remove(&self, task: &Arc<Task<K, R>>) -> bool {
        let mut tasks = self.tasks.write();
        match tasks.iter().position(|t| Arc::ptr_eq(t, task)) {
            Some(index) => {
                tasks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the first task with this key
    pub(crate) fn remove_key(&self, key: &K) -> Option<Arc<Task<K, R>>> {
        let mut tasks = self.tasks.write();
        let index = tasks.iter().position(|t| t.key() == key)?;
        tasks.remove(index)
    }

    /// First task with this key (oldest)
    pub(crate) fn find(&self, key: &K) -> Option<Arc<Task<K, R>>> {
        self.tasks.read().iter().find(|t| t.key() == key).cloned()
    }

    /// Last task with this key (most recent)
    pub(crate) fn find_last(&self, key: &K) -> Option<Arc<Task<K, R>>> {
        self.tasks.read().iter().rev().find(|t| t.key() == key).cloned()
    }

    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.tasks.read().iter().any(|t| t.key() == key)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Task<K, R>>> {
        self.tasks.read().iter().cloned().collect()
    }

    /// Count tasks matching a predicate
    pub(crate) fn count_where(&self, predicate: impl Fn(&Task<K, R>) -> bool) -> usize {
        self.tasks.read().iter().filter(|t| predicate(t)).count()
    }

    /// Drop the oldest entries until at most `capacity` remain
    pub(crate) fn evict_oldest(&self, capacity: usize) -> Vec<Arc<Task<K, R>>> {
        let mut tasks = self.tasks.write();
        let excess = tasks.len().saturating_sub(capacity);
        tasks.drain(..excess).collect()
    }

    pub(crate) fn clear(&self) -> Vec<Arc<Task<K, R>>> {
        self.tasks.write().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;

    fn task(key: &'static str) -> Arc<Task<&'static str, ()>> {
        Arc::new(Task::new(key, |_| Ok::<(), TaskError>(())))
    }

    #[test]
    fn test_fifo_and_lookup() {
        let queue = TaskQueue::new("waiting");
        queue.push_back(task("a"));
        queue.push_back(task("b"));

        assert_eq!(queue.len(), 2);
        assert!(queue.contains_key(&"b"));
        assert!(!queue.contains_key(&"c"));
        let keys: Vec<_> = queue.snapshot().iter().map(|t| *t.key()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_by_identity() {
        let queue = TaskQueue::new("executing");
        let first = task("a");
        let second = task("a");
        queue.push_back(first.clone());
        queue.push_back(second.clone());

        assert!(queue.remove(&second));
        assert!(!queue.remove(&second));
        assert!(Arc::ptr_eq(&queue.find(&"a").unwrap(), &first));
    }

    #[test]
    fn test_find_last_prefers_recent() {
        let queue = TaskQueue::new("finished");
        let old = task("a");
        let recent = task("a");
        queue.push_back(old);
        queue.push_back(recent.clone());
        assert!(Arc::ptr_eq(&queue.find_last(&"a").unwrap(), &recent));
    }

    #[test]
    fn test_evict_oldest() {
        let queue = TaskQueue::new("finished");
        for key in ["a", "b", "c", "d"] {
            queue.push_back(task(key));
        }

        let evicted: Vec<_> = queue.evict_oldest(2).iter().map(|t| *t.key()).collect();
        assert_eq!(evicted, vec!["a", "b"]);
        assert_eq!(queue.len(), 2);
        assert!(queue.evict_oldest(5).is_empty());
    }

    #[test]
    fn test_remove_key_and_clear() {
        let queue = TaskQueue::new("waiting");
        queue.push_back(task("a"));
        queue.push_back(task("b"));

        assert_eq!(queue.remove_key(&"a").map(|t| *t.key()), Some("a"));
        assert!(queue.remove_key(&"a").is_none());
        assert_eq!(queue.clear().len(), 1);
        assert_eq!(queue.len(), 0);
    }
}
