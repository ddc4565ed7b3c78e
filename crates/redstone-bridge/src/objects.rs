//! Host object handle table
//!
//! The embedded side never sees host objects directly. It holds opaque
//! [`ObjectHandle`]s that map to host-side values (JVM global references in
//! production) and asks for them to be released individually or all at once
//! during shutdown.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle for a host object
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle(u64);

static NEXT_OBJECT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl ObjectHandle {
    /// Generate a fresh handle. Handles are never reused within a process.
    fn next() -> Self {
        ObjectHandle(NEXT_OBJECT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value, as passed across the C boundary
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Rebuild a handle received from the C boundary
    pub fn from_u64(id: u64) -> Self {
        ObjectHandle(id)
    }
}

/// Concurrent table of host objects held on behalf of the embedded side
pub struct ObjectTable<T> {
    objects: DashMap<ObjectHandle, T>,
}

impl<T> ObjectTable<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Store an object and return its handle
    pub fn insert(&self, object: T) -> ObjectHandle {
        let handle = ObjectHandle::next();
        self.objects.insert(handle, object);
        handle
    }

    /// Remove an object, returning it so the caller can release it
    pub fn remove(&self, handle: ObjectHandle) -> Option<T> {
        self.objects.remove(&handle).map(|(_, object)| object)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Remove every object (for shutdown)
    pub fn drain(&self) -> Vec<T> {
        let handles: Vec<ObjectHandle> = self.objects.iter().map(|entry| *entry.key()).collect();
        handles
            .into_iter()
            .filter_map(|handle| self.remove(handle))
            .collect()
    }
}

impl<T: Clone> ObjectTable<T> {
    /// Get a copy of an object by handle
    pub fn get(&self, handle: ObjectHandle) -> Option<T> {
        self.objects.get(&handle).map(|entry| entry.clone())
    }
}

impl<T> Default for ObjectTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_handle_uniqueness() {
        let table = ObjectTable::new();
        let a = table.insert("a");
        let b = table.insert("b");
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_insert_get_remove() {
        let table = ObjectTable::new();
        let handle = table.insert(String::from("player"));
        assert_eq!(table.get(handle).as_deref(), Some("player"));
        assert_eq!(table.len(), 1);

        assert_eq!(table.remove(handle).as_deref(), Some("player"));
        assert!(table.get(handle).is_none());
        assert!(table.remove(handle).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_u64_round_trip() {
        let table = ObjectTable::new();
        let handle = table.insert(7);
        assert_eq!(table.get(ObjectHandle::from_u64(handle.as_u64())), Some(7));
    }

    #[test]
    fn test_drain() {
        let table = ObjectTable::new();
        for i in 0..5 {
            table.insert(i);
        }
        let mut drained = table.drain();
        drained.sort();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_concurrent_inserts() {
        let table = Arc::new(ObjectTable::new());
        let threads: Vec<_> = (0..4)
            .map(|t| {
                let table = table.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        table.insert(t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }
        assert_eq!(table.len(), 400);
    }
}
